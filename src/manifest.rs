use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::case::Modality;

pub const RESULT_FILENAME: &str = "result.json";
pub const OUTPUT_SLUG: &str = "stroke-lesion-segmentation";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ManifestError {
    #[snafu(display("IO error on manifest {}", path.display()))]
    IOError {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("could not encode or decode manifest {}", path.display()))]
    Json {
        path: PathBuf,
        #[snafu(source(from(serde_json::Error, Box::new)))]
        source: Box<serde_json::Error>,
    },
}

/// Kind of interface a role refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceKind {
    Image,
}

/// An input or output of a case, identified by interface slug and file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageRole {
    #[serde(rename = "type")]
    pub kind: InterfaceKind,
    pub slug: String,
    pub filename: String,
}

impl ImageRole {
    pub fn new<S: Into<String>, F: Into<String>>(slug: S, filename: F) -> Self {
        Self {
            kind: InterfaceKind::Image,
            slug: slug.into(),
            filename: filename.into(),
        }
    }
}

/// Manifest entry pairing the images produced for a case with the images it was computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseResult {
    pub outputs: Vec<ImageRole>,
    pub inputs: Vec<ImageRole>,
}

impl CaseResult {
    pub fn new(outputs: Vec<ImageRole>, inputs: Vec<ImageRole>) -> Self {
        Self { outputs, inputs }
    }

    /// Entry for a lesion mask written under the same file name as its DWI scan
    pub fn lesion_segmentation<S: AsRef<str>>(filename: S) -> Self {
        let filename = filename.as_ref();
        Self::new(
            vec![ImageRole::new(OUTPUT_SLUG, filename)],
            vec![ImageRole::new(Modality::Dwi.folder(), filename)],
        )
    }
}

pub fn write_manifest<P: AsRef<Path>>(path: P, results: &[CaseResult]) -> Result<(), ManifestError> {
    let path = path.as_ref();
    let file = File::create(path).context(IOSnafu { path })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, results).context(JsonSnafu { path })?;
    writer.flush().context(IOSnafu { path })?;
    Ok(())
}

pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<CaseResult>, ManifestError> {
    let path = path.as_ref();
    let file = File::open(path).context(IOSnafu { path })?;
    serde_json::from_reader(BufReader::new(file)).context(JsonSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lesion_segmentation_json() {
        let result = CaseResult::lesion_segmentation("sub-strokecase0001_dwi.mha");
        assert_eq!(
            serde_json::to_value(vec![result]).unwrap(),
            json!([{
                "outputs": [{
                    "type": "Image",
                    "slug": "stroke-lesion-segmentation",
                    "filename": "sub-strokecase0001_dwi.mha"
                }],
                "inputs": [{
                    "type": "Image",
                    "slug": "dwi-brain-mri",
                    "filename": "sub-strokecase0001_dwi.mha"
                }]
            }])
        );
    }

    #[test]
    fn test_write_read_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RESULT_FILENAME);
        let results = vec![
            CaseResult::lesion_segmentation("a.mha"),
            CaseResult::new(vec![], vec![ImageRole::new("adc-brain-mri", "b.mha")]),
        ];

        write_manifest(&path, &results).unwrap();

        assert_eq!(read_manifest(&path).unwrap(), results);
    }

    #[test]
    fn test_read_rejects_unknown_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RESULT_FILENAME);
        fs::write(
            &path,
            r#"[{"outputs": [{"type": "Metric", "slug": "x", "filename": "y"}], "inputs": []}]"#,
        )
        .unwrap();

        assert!(matches!(read_manifest(&path), Err(ManifestError::Json { .. })));
    }

    #[test]
    fn test_write_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join(RESULT_FILENAME);
        let result = write_manifest(&path, &[CaseResult::lesion_segmentation("a.mha")]);
        assert!(matches!(result, Err(ManifestError::IOError { .. })));
    }
}
