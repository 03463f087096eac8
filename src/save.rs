use flate2::write::ZlibEncoder;
use flate2::Compression;
use snafu::ResultExt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::errors::mha::{CompressSnafu, IOSnafu, MhaError};
use crate::metadata::MhaHeader;
use crate::volume::Volume;

/// Writes volumes as single-file MetaImages (`ElementDataFile = LOCAL`, little endian)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MhaWriter {
    compress: bool,
}

impl MhaWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compress voxel data with zlib
    pub fn with_compression(self, compress: bool) -> Self {
        Self { compress }
    }

    pub fn write<P: AsRef<Path>>(&self, volume: &Volume, path: P) -> Result<(), MhaError> {
        let path = path.as_ref();
        let raw = volume.data().to_le_bytes();
        let header = MhaHeader::new(*volume.geometry(), volume.pixel_type());

        let (header, data) = if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw).context(CompressSnafu { path })?;
            let compressed = encoder.finish().context(CompressSnafu { path })?;
            (header.with_compressed_size(compressed.len()), compressed)
        } else {
            (header, raw)
        };

        let mut writer = BufWriter::new(File::create(path).context(IOSnafu { path })?);
        header.write_to(&mut writer).context(IOSnafu { path })?;
        writer.write_all(&data).context(IOSnafu { path })?;
        writer.flush().context(IOSnafu { path })?;
        debug!(
            "Wrote {} ({}, {} bytes of voxel data)",
            path.display(),
            header.element_type,
            data.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Geometry;
    use crate::volume::VolumeData;
    use ndarray::Array3;
    use tempfile::tempdir;

    #[test]
    fn test_write_uncompressed_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mask.mha");
        let volume = Volume::new(
            Geometry::new([2, 1, 1]).with_spacing([2.0, 2.0, 2.0]),
            VolumeData::UInt8(Array3::from_shape_vec((1, 1, 2), vec![7, 9]).unwrap()),
        )
        .unwrap();

        MhaWriter::new().write(&volume, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("ObjectType = Image\nNDims = 3\n"));
        assert!(text.contains("CompressedData = False\n"));
        assert!(text.contains("ElementSpacing = 2 2 2\n"));
        assert!(text.contains("DimSize = 2 1 1\n"));
        assert!(text.contains("ElementType = MET_UCHAR\n"));
        assert!(bytes.ends_with(b"ElementDataFile = LOCAL\n\x07\x09"));
    }

    #[test]
    fn test_write_compressed_is_smaller() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.mha");
        let compressed = dir.path().join("compressed.mha");
        let volume = Volume::zeros(Geometry::new([64, 64, 16]), crate::metadata::PixelType::Float32);

        MhaWriter::new().write(&volume, &plain).unwrap();
        MhaWriter::new()
            .with_compression(true)
            .write(&volume, &compressed)
            .unwrap();

        let plain_len = std::fs::metadata(&plain).unwrap().len();
        let compressed_len = std::fs::metadata(&compressed).unwrap().len();
        assert!(compressed_len < plain_len);
        let text = String::from_utf8_lossy(&std::fs::read(&compressed).unwrap()).to_string();
        assert!(text.contains("CompressedData = True\nCompressedDataSize = "));
    }

    #[test]
    fn test_write_to_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("mask.mha");
        let volume = Volume::zeros(Geometry::new([1, 1, 1]), crate::metadata::PixelType::UInt8);
        let result = MhaWriter::new().write(&volume, &path);
        assert!(matches!(result, Err(MhaError::IOError { .. })));
    }
}
