use flate2::read::ZlibDecoder;
use snafu::{ensure, ResultExt};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::errors::mha::{
    DataSizeMismatchSnafu, DecompressSnafu, IOSnafu, InvalidHeaderSnafu, InvalidShapeSnafu,
    MhaError,
};
use crate::metadata::{ElementDataFile, MhaHeader};
use crate::volume::{Volume, VolumeData};

/// Read a MetaImage volume. Accepts single-file `.mha` images as well as `.mhd` headers
/// pointing at a detached data file. Two-dimensional images load as a single slice.
pub fn read_mha<P: AsRef<Path>>(path: P) -> Result<Volume, MhaError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path).context(IOSnafu { path })?);
    let header = MhaHeader::parse(&mut reader).context(InvalidHeaderSnafu { path })?;
    debug!(
        "Read MetaImage header from {}: {} {:?}",
        path.display(),
        header.element_type,
        header.geometry.size
    );

    let raw = match &header.data_file {
        ElementDataFile::Local => read_all(&mut reader, path)?,
        ElementDataFile::Detached(data_file) => {
            let data_path = match path.parent() {
                Some(parent) => parent.join(data_file),
                None => data_file.clone(),
            };
            let file = File::open(&data_path).context(IOSnafu { path: &data_path })?;
            read_all(&mut BufReader::new(file), &data_path)?
        }
    };

    let expected = header.data_len();
    let bytes = if header.compressed {
        // Inflate no more than the header declares
        let mut decoded = Vec::new();
        ZlibDecoder::new(raw.as_slice())
            .take(expected as u64)
            .read_to_end(&mut decoded)
            .context(DecompressSnafu { path })?;
        decoded
    } else {
        raw
    };

    ensure!(
        bytes.len() >= expected,
        DataSizeMismatchSnafu {
            expected,
            actual: bytes.len()
        }
    );
    if bytes.len() > expected {
        debug!(
            "Ignoring {} trailing bytes in {}",
            bytes.len() - expected,
            path.display()
        );
    }

    let data = VolumeData::from_bytes(
        header.element_type,
        header.geometry.shape(),
        &bytes[..expected],
        header.big_endian,
    )
    .context(InvalidShapeSnafu)?;
    Volume::new(header.geometry, data).map_err(|e| MhaError::InvalidValue {
        key: "DimSize".to_string(),
        value: e.to_string(),
    })
}

fn read_all<R: BufRead>(reader: &mut R, path: &Path) -> Result<Vec<u8>, MhaError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context(IOSnafu { path })?;
    Ok(bytes)
}
