use std::fmt;
use std::str::FromStr;

use crate::errors::mha::{MhaError, UnsupportedElementTypeSnafu};

/// Voxel element types that can be stored in a MetaImage file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub const ALL: [PixelType; 8] = [
        PixelType::UInt8,
        PixelType::Int8,
        PixelType::UInt16,
        PixelType::Int16,
        PixelType::UInt32,
        PixelType::Int32,
        PixelType::Float32,
        PixelType::Float64,
    ];

    /// The `ElementType` name used in MetaImage headers
    pub fn met_name(&self) -> &'static str {
        match self {
            PixelType::UInt8 => "MET_UCHAR",
            PixelType::Int8 => "MET_CHAR",
            PixelType::UInt16 => "MET_USHORT",
            PixelType::Int16 => "MET_SHORT",
            PixelType::UInt32 => "MET_UINT",
            PixelType::Int32 => "MET_INT",
            PixelType::Float32 => "MET_FLOAT",
            PixelType::Float64 => "MET_DOUBLE",
        }
    }

    /// Size of a single element in bytes
    pub fn size(&self) -> usize {
        match self {
            PixelType::UInt8 | PixelType::Int8 => 1,
            PixelType::UInt16 | PixelType::Int16 => 2,
            PixelType::UInt32 | PixelType::Int32 | PixelType::Float32 => 4,
            PixelType::Float64 => 8,
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.met_name())
    }
}

impl FromStr for PixelType {
    type Err = MhaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelType::ALL
            .into_iter()
            .find(|p| p.met_name() == s)
            .ok_or_else(|| UnsupportedElementTypeSnafu { value: s }.build())
    }
}
