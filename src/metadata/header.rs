use snafu::{ensure, OptionExt, ResultExt};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::errors::mha::{
    InvalidValueSnafu, MalformedLineSnafu, MhaError, MissingKeySnafu, ReadHeaderLineSnafu,
    UnsupportedChannelsSnafu, UnsupportedDimensionsSnafu,
};
use crate::metadata::{Geometry, PixelType, IDENTITY_DIRECTION};

pub const LOCAL_DATA_FILE: &str = "LOCAL";

/// Location of the voxel data described by a header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementDataFile {
    /// Data follows the header in the same file (`.mha`)
    Local,
    /// Data lives in a separate file, relative to the header (`.mhd`)
    Detached(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MhaHeader {
    pub ndims: usize,
    pub geometry: Geometry,
    pub element_type: PixelType,
    pub big_endian: bool,
    pub compressed: bool,
    pub compressed_size: Option<usize>,
    pub data_file: ElementDataFile,
}

impl MhaHeader {
    /// Header for writing a 3D volume with data stored locally
    pub fn new(geometry: Geometry, element_type: PixelType) -> Self {
        Self {
            ndims: 3,
            geometry,
            element_type,
            big_endian: false,
            compressed: false,
            compressed_size: None,
            data_file: ElementDataFile::Local,
        }
    }

    pub fn with_compressed_size(self, compressed_size: usize) -> Self {
        Self {
            compressed: true,
            compressed_size: Some(compressed_size),
            ..self
        }
    }

    /// Number of bytes of uncompressed voxel data
    pub fn data_len(&self) -> usize {
        self.geometry.numel() * self.element_type.size()
    }

    /// Like `data_len`, but `None` when the byte count does not fit in `usize`
    pub fn checked_data_len(&self) -> Option<usize> {
        self.geometry
            .checked_numel()?
            .checked_mul(self.element_type.size())
    }

    /// Parse a header, consuming lines up to and including `ElementDataFile`.
    /// The reader is left positioned at the first byte of local voxel data.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self, MhaError> {
        let mut fields = HeaderFields::default();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .context(ReadHeaderLineSnafu)?;
            ensure!(
                read > 0,
                MissingKeySnafu {
                    key: "ElementDataFile"
                }
            );

            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let (key, value) = text
                .split_once('=')
                .context(MalformedLineSnafu { line: text })?;
            let (key, value) = (key.trim(), value.trim());
            debug!("MetaImage header: {} = {}", key, value);

            if key == "ElementDataFile" {
                fields.data_file = Some(value.to_string());
                break;
            }
            fields.set(key, value)?;
        }
        fields.build()
    }

    /// Write the header text, ending with the `ElementDataFile` line
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let geometry = &self.geometry;
        // TransformMatrix lists each axis direction in turn, i.e. the columns of `direction`
        let d = &geometry.direction;
        let transform = [d[0], d[3], d[6], d[1], d[4], d[7], d[2], d[5], d[8]];

        writeln!(writer, "ObjectType = Image")?;
        writeln!(writer, "NDims = {}", self.ndims)?;
        writeln!(writer, "BinaryData = True")?;
        writeln!(writer, "BinaryDataByteOrderMSB = {}", bool_str(self.big_endian))?;
        writeln!(writer, "CompressedData = {}", bool_str(self.compressed))?;
        if let Some(size) = self.compressed_size {
            writeln!(writer, "CompressedDataSize = {}", size)?;
        }
        writeln!(writer, "TransformMatrix = {}", join(&transform))?;
        writeln!(writer, "Offset = {}", join(&geometry.origin))?;
        writeln!(writer, "CenterOfRotation = 0 0 0")?;
        writeln!(
            writer,
            "AnatomicalOrientation = {}",
            geometry.orientation_code()
        )?;
        writeln!(writer, "ElementSpacing = {}", join(&geometry.spacing))?;
        writeln!(writer, "DimSize = {}", join(&geometry.size))?;
        writeln!(writer, "ElementType = {}", self.element_type)?;
        let data_file = match &self.data_file {
            ElementDataFile::Local => LOCAL_DATA_FILE.to_string(),
            ElementDataFile::Detached(path) => path.display().to_string(),
        };
        writeln!(writer, "ElementDataFile = {}", data_file)?;
        Ok(())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_bool(key: &str, value: &str) -> Result<bool, MhaError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => InvalidValueSnafu { key, value }.fail(),
    }
}

fn parse_scalar<T: FromStr>(key: &str, value: &str) -> Result<T, MhaError> {
    value
        .parse::<T>()
        .ok()
        .context(InvalidValueSnafu { key, value })
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, MhaError> {
    value
        .split_whitespace()
        .map(|v| v.parse::<T>().ok())
        .collect::<Option<Vec<_>>>()
        .context(InvalidValueSnafu { key, value })
}

/// Raw header values, collected before the number of dimensions is known
#[derive(Debug, Default)]
struct HeaderFields {
    ndims: Option<usize>,
    size: Option<Vec<usize>>,
    spacing: Option<Vec<f64>>,
    element_size: Option<Vec<f64>>,
    origin: Option<Vec<f64>>,
    transform: Option<Vec<f64>>,
    element_type: Option<PixelType>,
    channels: usize,
    big_endian: bool,
    compressed: bool,
    compressed_size: Option<usize>,
    data_file: Option<String>,
}

impl HeaderFields {
    fn set(&mut self, key: &str, value: &str) -> Result<(), MhaError> {
        match key {
            "ObjectType" => ensure!(value == "Image", InvalidValueSnafu { key, value }),
            "NDims" => self.ndims = Some(parse_scalar(key, value)?),
            "DimSize" => self.size = Some(parse_list(key, value)?),
            "ElementSpacing" => self.spacing = Some(parse_list(key, value)?),
            "ElementSize" => self.element_size = Some(parse_list(key, value)?),
            "Offset" | "Position" | "Origin" => self.origin = Some(parse_list(key, value)?),
            "TransformMatrix" | "Rotation" | "Orientation" => {
                self.transform = Some(parse_list(key, value)?)
            }
            "ElementType" => self.element_type = Some(value.parse()?),
            "ElementNumberOfChannels" => self.channels = parse_scalar(key, value)?,
            "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => {
                self.big_endian = parse_bool(key, value)?
            }
            "CompressedData" => self.compressed = parse_bool(key, value)?,
            "CompressedDataSize" => self.compressed_size = Some(parse_scalar(key, value)?),
            "BinaryData" => ensure!(parse_bool(key, value)?, InvalidValueSnafu { key, value }),
            _ => debug!("Ignoring MetaImage header key {}", key),
        }
        Ok(())
    }

    fn build(self) -> Result<MhaHeader, MhaError> {
        let ndims = self.ndims.context(MissingKeySnafu { key: "NDims" })?;
        ensure!((2..=3).contains(&ndims), UnsupportedDimensionsSnafu { ndims });
        ensure!(
            self.channels <= 1,
            UnsupportedChannelsSnafu {
                channels: self.channels
            }
        );

        let size = self.size.context(MissingKeySnafu { key: "DimSize" })?;
        let size = pad(&size, ndims, 1, "DimSize")?;
        // ElementSize is the voxel extent, used as spacing only when none is given
        let spacing = match (self.spacing, self.element_size) {
            (Some(spacing), _) => pad(&spacing, ndims, 1.0, "ElementSpacing")?,
            (None, Some(element_size)) => pad(&element_size, ndims, 1.0, "ElementSize")?,
            (None, None) => [1.0; 3],
        };
        let origin = match self.origin {
            Some(origin) => pad(&origin, ndims, 0.0, "Offset")?,
            None => [0.0; 3],
        };
        let direction = match self.transform {
            Some(transform) => direction_from_transform(&transform, ndims)?,
            None => IDENTITY_DIRECTION,
        };
        let element_type = self
            .element_type
            .context(MissingKeySnafu { key: "ElementType" })?;
        let data_file = match self.data_file.as_deref() {
            Some(LOCAL_DATA_FILE) => ElementDataFile::Local,
            Some(path) => ElementDataFile::Detached(PathBuf::from(path)),
            None => return MissingKeySnafu { key: "ElementDataFile" }.fail(),
        };

        let header = MhaHeader {
            ndims,
            geometry: Geometry {
                origin,
                spacing,
                direction,
                size,
            },
            element_type,
            big_endian: self.big_endian,
            compressed: self.compressed,
            compressed_size: self.compressed_size,
            data_file,
        };
        ensure!(
            header.checked_data_len().is_some(),
            InvalidValueSnafu {
                key: "DimSize",
                value: join(&size)
            }
        );
        Ok(header)
    }
}

/// Extend an `ndims`-long list to three entries, filling with `fill`
fn pad<T: Copy + ToString>(
    values: &[T],
    ndims: usize,
    fill: T,
    key: &str,
) -> Result<[T; 3], MhaError> {
    ensure!(
        values.len() == ndims,
        InvalidValueSnafu {
            key,
            value: join(values)
        }
    );
    let mut out = [fill; 3];
    out[..ndims].copy_from_slice(values);
    Ok(out)
}

/// Convert a TransformMatrix (axis directions listed in turn) into a row-major 3x3 direction
fn direction_from_transform(transform: &[f64], ndims: usize) -> Result<[f64; 9], MhaError> {
    ensure!(
        transform.len() == ndims * ndims,
        InvalidValueSnafu {
            key: "TransformMatrix",
            value: join(transform)
        }
    );
    let mut direction = IDENTITY_DIRECTION;
    for axis in 0..ndims {
        for component in 0..ndims {
            direction[component * 3 + axis] = transform[axis * ndims + component];
        }
    }
    Ok(direction)
}
