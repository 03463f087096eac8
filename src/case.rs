use snafu::{ResultExt, Snafu};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::file::{Matches, MhaFileOperations};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LocateError {
    #[snafu(display("{} folder not found: {}", modality, path.display()))]
    MissingFolder { modality: Modality, path: PathBuf },

    #[snafu(display("error searching {} folder {}", modality, path.display()))]
    Search {
        modality: Modality,
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("no .mha file found in {} folder {}", modality, path.display()))]
    NoMatch { modality: Modality, path: PathBuf },

    #[snafu(display(
        "expected one .mha file in {} folder {}, found {}: {:?}",
        modality,
        path.display(),
        candidates.len(),
        candidates
    ))]
    AmbiguousMatch {
        modality: Modality,
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },
}

/// MRI sequences provided for each ISLES22 case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Dwi,
    Adc,
    Flair,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Dwi, Modality::Adc, Modality::Flair];

    /// Folder name under the images root, also used as the interface slug
    pub fn folder(&self) -> &'static str {
        match self {
            Modality::Dwi => "dwi-brain-mri",
            Modality::Adc => "adc-brain-mri",
            Modality::Flair => "flair-brain-mri",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::Dwi => "DWI",
            Modality::Adc => "ADC",
            Modality::Flair => "FLAIR",
        };
        write!(f, "{name}")
    }
}

/// Scan paths of a single case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    root: PathBuf,
    dwi: PathBuf,
    adc: PathBuf,
    flair: PathBuf,
}

impl Case {
    /// Locate one scan per modality under `root/<modality folder>/*.mha`.
    /// Each folder must hold exactly one MetaImage file.
    pub fn locate<P: AsRef<Path>>(root: P) -> Result<Self, LocateError> {
        let root = root.as_ref();
        let case = Self {
            root: root.to_path_buf(),
            dwi: locate_scan(root, Modality::Dwi)?,
            adc: locate_scan(root, Modality::Adc)?,
            flair: locate_scan(root, Modality::Flair)?,
        };
        Ok(case)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, modality: Modality) -> &Path {
        match modality {
            Modality::Dwi => &self.dwi,
            Modality::Adc => &self.adc,
            Modality::Flair => &self.flair,
        }
    }

    pub fn dwi_path(&self) -> &Path {
        &self.dwi
    }

    pub fn adc_path(&self) -> &Path {
        &self.adc
    }

    pub fn flair_path(&self) -> &Path {
        &self.flair
    }

    /// File name of a modality's scan
    pub fn filename(&self, modality: Modality) -> String {
        self.path(modality)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

fn locate_scan(root: &Path, modality: Modality) -> Result<PathBuf, LocateError> {
    let folder = root.join(modality.folder());
    if !folder.is_dir() {
        return MissingFolderSnafu {
            modality,
            path: folder,
        }
        .fail();
    }

    let matches = folder.find_unique_mha().context(SearchSnafu {
        modality,
        path: &folder,
    })?;
    match matches {
        Matches::One(path) => {
            info!("Found {} scan: {}", modality, path.display());
            Ok(path)
        }
        Matches::None => NoMatchSnafu {
            modality,
            path: folder,
        }
        .fail(),
        Matches::Many(candidates) => AmbiguousMatchSnafu {
            modality,
            path: folder,
            candidates,
        }
        .fail(),
    }
}
