use ndarray::Array3;
use num::ToPrimitive;
use snafu::{ensure, Snafu};

use crate::metadata::{Geometry, PixelType};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VolumeError {
    #[snafu(display(
        "voxel array shape {:?} does not match geometry size {:?} (expected shape {:?})",
        actual,
        size,
        expected
    ))]
    ShapeMismatch {
        actual: (usize, usize, usize),
        expected: (usize, usize, usize),
        size: [usize; 3],
    },
}

/// A scalar voxel type with a MetaImage representation
pub trait Voxel: Copy + Default + Send + Sync + ToPrimitive + 'static {
    const PIXEL_TYPE: PixelType;

    /// Decode from exactly `PIXEL_TYPE.size()` bytes
    fn read(bytes: &[u8], big_endian: bool) -> Self;

    fn write_le(self, out: &mut Vec<u8>);

    /// Convert an interpolated sample, saturating for integer types
    fn from_sample(value: f64) -> Self;

    fn wrap(array: Array3<Self>) -> VolumeData;
}

macro_rules! impl_voxel {
    ($t:ty, $variant:ident) => {
        impl Voxel for $t {
            const PIXEL_TYPE: PixelType = PixelType::$variant;

            fn read(bytes: &[u8], big_endian: bool) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                if big_endian {
                    <$t>::from_be_bytes(buf)
                } else {
                    <$t>::from_le_bytes(buf)
                }
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn from_sample(value: f64) -> Self {
                value as $t
            }

            fn wrap(array: Array3<Self>) -> VolumeData {
                VolumeData::$variant(array)
            }
        }
    };
}

impl_voxel!(u8, UInt8);
impl_voxel!(i8, Int8);
impl_voxel!(u16, UInt16);
impl_voxel!(i16, Int16);
impl_voxel!(u32, UInt32);
impl_voxel!(i32, Int32);
impl_voxel!(f32, Float32);
impl_voxel!(f64, Float64);

/// Typed voxel storage, shaped (z, y, x)
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    UInt8(Array3<u8>),
    Int8(Array3<i8>),
    UInt16(Array3<u16>),
    Int16(Array3<i16>),
    UInt32(Array3<u32>),
    Int32(Array3<i32>),
    Float32(Array3<f32>),
    Float64(Array3<f64>),
}

/// Run `$body` with `$array` bound to the typed array inside a `VolumeData`
macro_rules! with_array {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            VolumeData::UInt8($array) => $body,
            VolumeData::Int8($array) => $body,
            VolumeData::UInt16($array) => $body,
            VolumeData::Int16($array) => $body,
            VolumeData::UInt32($array) => $body,
            VolumeData::Int32($array) => $body,
            VolumeData::Float32($array) => $body,
            VolumeData::Float64($array) => $body,
        }
    };
}

/// Run `$body` with `$t` bound to the voxel type matching a `PixelType`
macro_rules! with_voxel_type {
    ($pixel_type:expr, $t:ident => $body:expr) => {
        match $pixel_type {
            PixelType::UInt8 => {
                type $t = u8;
                $body
            }
            PixelType::Int8 => {
                type $t = i8;
                $body
            }
            PixelType::UInt16 => {
                type $t = u16;
                $body
            }
            PixelType::Int16 => {
                type $t = i16;
                $body
            }
            PixelType::UInt32 => {
                type $t = u32;
                $body
            }
            PixelType::Int32 => {
                type $t = i32;
                $body
            }
            PixelType::Float32 => {
                type $t = f32;
                $body
            }
            PixelType::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

impl VolumeData {
    pub fn zeros(pixel_type: PixelType, shape: (usize, usize, usize)) -> Self {
        with_voxel_type!(pixel_type, T => T::wrap(Array3::<T>::zeros(shape)))
    }

    /// Cast floating point samples to the requested pixel type
    pub fn from_samples(samples: Array3<f64>, pixel_type: PixelType) -> Self {
        with_voxel_type!(pixel_type, T => T::wrap(samples.mapv(T::from_sample)))
    }

    /// Decode a flat little or big endian buffer of exactly `numel * pixel_type.size()` bytes
    pub fn from_bytes(
        pixel_type: PixelType,
        shape: (usize, usize, usize),
        bytes: &[u8],
        big_endian: bool,
    ) -> Result<Self, ndarray::ShapeError> {
        with_voxel_type!(pixel_type, T => {
            let values = bytes
                .chunks_exact(pixel_type.size())
                .map(|chunk| T::read(chunk, big_endian))
                .collect::<Vec<_>>();
            Array3::from_shape_vec(shape, values).map(T::wrap)
        })
    }

    /// Flatten to little endian bytes in (z, y, x) order, x fastest
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.pixel_type().size());
        with_array!(self, array => array.iter().for_each(|v| v.write_le(&mut out)));
        out
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            VolumeData::UInt8(_) => PixelType::UInt8,
            VolumeData::Int8(_) => PixelType::Int8,
            VolumeData::UInt16(_) => PixelType::UInt16,
            VolumeData::Int16(_) => PixelType::Int16,
            VolumeData::UInt32(_) => PixelType::UInt32,
            VolumeData::Int32(_) => PixelType::Int32,
            VolumeData::Float32(_) => PixelType::Float32,
            VolumeData::Float64(_) => PixelType::Float64,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        with_array!(self, array => array.dim())
    }

    pub fn len(&self) -> usize {
        with_array!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values widened to `f64` for sampling
    pub fn to_f64(&self) -> Array3<f64> {
        with_array!(self, array => array.mapv(|v| v.to_f64().unwrap_or(0.0)))
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.pixel_type(), self.shape())
    }

    pub fn is_all_zero(&self) -> bool {
        with_array!(self, array => array.iter().all(|v| v.to_f64() == Some(0.0)))
    }
}

/// A volumetric image: typed voxels plus the spatial metadata placing them in physical space
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    geometry: Geometry,
    data: VolumeData,
}

impl Volume {
    /// Pair voxel data with a geometry. The data shape must equal the geometry's (z, y, x) shape.
    pub fn new(geometry: Geometry, data: VolumeData) -> Result<Self, VolumeError> {
        ensure!(
            data.shape() == geometry.shape(),
            ShapeMismatchSnafu {
                actual: data.shape(),
                expected: geometry.shape(),
                size: geometry.size,
            }
        );
        Ok(Self { geometry, data })
    }

    /// Wrap a (z, y, x) array with default geometry
    pub fn from_array<T: Voxel>(array: Array3<T>) -> Self {
        let (z, y, x) = array.dim();
        Self {
            geometry: Geometry::new([x, y, z]),
            data: T::wrap(array),
        }
    }

    pub fn zeros(geometry: Geometry, pixel_type: PixelType) -> Self {
        Self {
            data: VolumeData::zeros(pixel_type, geometry.shape()),
            geometry,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn data(&self) -> &VolumeData {
        &self.data
    }

    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }

    pub fn origin(&self) -> [f64; 3] {
        self.geometry.origin
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.geometry.spacing
    }

    pub fn direction(&self) -> [f64; 9] {
        self.geometry.direction
    }

    pub fn size(&self) -> [usize; 3] {
        self.geometry.size
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.geometry.origin = origin;
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.geometry.spacing = spacing;
    }

    pub fn set_direction(&mut self, direction: [f64; 9]) {
        self.geometry.direction = direction;
    }
}
