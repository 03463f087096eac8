//! Turns a lesion prediction into a challenge submission.
//!
//! The DWI scan of the case is the reference: the prediction is written under the DWI
//! file name with the DWI grid's origin, spacing and direction, alongside a `result.json`
//! manifest describing the case. A missing prediction is replaced by an empty mask.

use snafu::{ResultExt, Snafu};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::case::{Case, LocateError, Modality};
use crate::errors::MhaError;
use crate::file::{Matches, MhaFileOperations};
use crate::manifest::{write_manifest, CaseResult, ManifestError, RESULT_FILENAME};
use crate::metadata::Geometry;
use crate::save::MhaWriter;
use crate::transform::CopyMetadata;
use crate::volume::Volume;

pub const DEFAULT_IMAGES_ROOT: &str = "/input/images";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SubmissionError {
    #[snafu(display("Failed to create directory: {}", path.display()))]
    CreateDir {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("could not locate case scans: {}", source))]
    Locate {
        #[snafu(source(from(LocateError, Box::new)))]
        source: Box<LocateError>,
    },

    #[snafu(display("could not read reference scan {}", path.display()))]
    ReadReference {
        path: PathBuf,
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("error searching for a prediction in {}", path.display()))]
    SearchPrediction {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display(
        "expected at most one prediction in {}, found {}: {:?}",
        path.display(),
        candidates.len(),
        candidates
    ))]
    AmbiguousPrediction {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[snafu(display("could not read prediction {}", path.display()))]
    ReadPrediction {
        path: PathBuf,
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("could not write mask {}", path.display()))]
    WriteMask {
        path: PathBuf,
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("could not write manifest: {}", source))]
    WriteManifest {
        #[snafu(source(from(ManifestError, Box::new)))]
        source: Box<ManifestError>,
    },
}

/// Look for the prediction in `folder`.
///
/// A missing folder or a folder without `.mha` files yields `Ok(None)`. More than one
/// candidate is an error rather than an arbitrary pick.
pub fn find_prediction<P: AsRef<Path>>(folder: P) -> Result<Option<PathBuf>, SubmissionError> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return Ok(None);
    }
    let matches = folder
        .find_unique_mha()
        .context(SearchPredictionSnafu { path: folder })?;
    match matches {
        Matches::None => Ok(None),
        Matches::One(path) => Ok(Some(path)),
        Matches::Many(candidates) => AmbiguousPredictionSnafu {
            path: folder,
            candidates,
        }
        .fail(),
    }
}

/// Empty mask with the reference's size and pixel type, on a default grid
pub fn zero_mask_like(reference: &Volume) -> Volume {
    Volume::zeros(Geometry::new(reference.size()), reference.pixel_type())
}

/// Give `mask` the origin, spacing and direction of `reference`
pub fn conform_metadata(mut mask: Volume, reference: &Volume) -> Volume {
    CopyMetadata::from_reference(reference).apply_in_place(&mut mask);
    mask
}

/// Paths produced by a submission run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mask_path: PathBuf,
    pub manifest_path: PathBuf,
    /// Prediction that was written, `None` when an empty mask was used instead
    pub prediction: Option<PathBuf>,
}

impl RunSummary {
    pub fn used_fallback(&self) -> bool {
        self.prediction.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    images_root: PathBuf,
    input_folder: PathBuf,
    output_folder: PathBuf,
    compress: bool,
}

impl Submission {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_folder: P, output_folder: Q) -> Self {
        Self {
            images_root: PathBuf::from(DEFAULT_IMAGES_ROOT),
            input_folder: input_folder.as_ref().to_path_buf(),
            output_folder: output_folder.as_ref().to_path_buf(),
            compress: false,
        }
    }

    /// Directory holding the `<modality>-brain-mri` scan folders
    pub fn with_images_root<P: AsRef<Path>>(self, images_root: P) -> Self {
        Self {
            images_root: images_root.as_ref().to_path_buf(),
            ..self
        }
    }

    pub fn with_compression(self, compress: bool) -> Self {
        Self { compress, ..self }
    }

    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    pub fn run(&self) -> Result<RunSummary, SubmissionError> {
        let output = self.output_folder.as_path();
        std::fs::create_dir_all(output).context(CreateDirSnafu { path: output })?;

        let case = Case::locate(&self.images_root).context(LocateSnafu)?;
        let reference = case
            .dwi_path()
            .read_mha()
            .context(ReadReferenceSnafu {
                path: case.dwi_path(),
            })?;

        let prediction = find_prediction(&self.input_folder)?;
        let mask = match &prediction {
            Some(path) => {
                info!("Found prediction: {}", path.display());
                path.read_mha().context(ReadPredictionSnafu { path })?
            }
            None => {
                warn!(
                    "No prediction found in {}, submitting an empty mask",
                    self.input_folder.display()
                );
                zero_mask_like(&reference)
            }
        };
        let mask = conform_metadata(mask, &reference);

        let filename = case.filename(Modality::Dwi);
        let mask_path = output.join(&filename);
        MhaWriter::new()
            .with_compression(self.compress)
            .write(&mask, &mask_path)
            .context(WriteMaskSnafu { path: &mask_path })?;
        info!("Wrote mask: {}", mask_path.display());

        let manifest_path = output.join(RESULT_FILENAME);
        write_manifest(&manifest_path, &[CaseResult::lesion_segmentation(&filename)])
            .context(WriteManifestSnafu)?;
        info!("Wrote manifest: {}", manifest_path.display());

        Ok(RunSummary {
            mask_path,
            manifest_path,
            prediction,
        })
    }
}
