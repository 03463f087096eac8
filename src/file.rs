use glob::{glob_with, GlobError, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use crate::errors::MhaError;
use crate::load::read_mha;
use crate::volume::Volume;

type IOResult<T> = Result<T, std::io::Error>;

pub const MHA_EXTENSION: &str = "mha";
pub const MHD_EXTENSION: &str = "mhd";

pub fn default_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta} @ {per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// Outcome of searching a directory for files that should be unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matches {
    None,
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl From<Vec<PathBuf>> for Matches {
    fn from(mut paths: Vec<PathBuf>) -> Self {
        match paths.len() {
            0 => Matches::None,
            1 => Matches::One(paths.remove(0)),
            _ => Matches::Many(paths),
        }
    }
}

pub trait MhaFileOperations
where
    Self: AsRef<Path>,
{
    /// Check if a file has a MetaImage extension.
    fn has_mha_extension(&self) -> bool {
        self.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MHA_EXTENSION))
    }

    /// Check if a path is an existing MetaImage file.
    fn is_mha_file(&self) -> bool {
        self.as_ref().is_file() && self.has_mha_extension()
    }

    /// Check if a path is an existing MetaImage file, either single-file (`.mha`)
    /// or a detached header (`.mhd`).
    fn is_metaimage_file(&self) -> bool {
        let is_mhd = self
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MHD_EXTENSION));
        self.as_ref().is_file() && (is_mhd || self.has_mha_extension())
    }

    /// Find the MetaImage files directly inside a directory, sorted by path.
    /// Hidden files are included, subdirectories are not searched. Unreadable
    /// entries are reported as errors.
    fn find_mhas(&self) -> IOResult<Vec<PathBuf>> {
        let dir = self.as_ref();
        if !dir.is_dir() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("Not a directory: {}", dir.display()),
            ));
        }
        let dir_str = dir.to_str().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Non UTF-8 directory: {}", dir.display()),
            )
        })?;
        let pattern = Path::new(&Pattern::escape(dir_str)).join("*");
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let result = glob_with(&pattern.to_string_lossy(), options)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?
            .map(|entry| entry.map_err(GlobError::into_error))
            .filter_ok(|file| file.is_mha_file())
            .collect::<IOResult<Vec<_>>>()?
            .into_iter()
            .sorted()
            .collect();
        Ok(result)
    }

    /// Find MetaImage files directly inside a directory, classified by how many were found.
    fn find_unique_mha(&self) -> IOResult<Matches> {
        Ok(Matches::from(self.find_mhas()?))
    }

    /// Read the MetaImage file.
    fn read_mha(&self) -> Result<Volume, MhaError> {
        read_mha(self.as_ref())
    }
}

impl<P: AsRef<Path>> MhaFileOperations for P {}
