//! Resampling of a volume onto the voxel grid of another.
//!
//! Every output voxel is mapped to its physical location, then into the continuous
//! index space of the source, where the source is evaluated with the selected
//! [`Interpolator`]. The transform between the two physical spaces is the identity:
//! only the grid definition changes. Locations outside the source receive the
//! default value (zero unless configured otherwise).

use indicatif::{ParallelProgressIterator, ProgressBar};
use ndarray::{Array3, ArrayD, ArrayViewMut2, Axis, Ix3};
use rayon::prelude::*;
use snafu::{OptionExt, ResultExt, Snafu};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::MhaError;
use crate::file::default_bar;
use crate::load::read_mha;
use crate::metadata::{Geometry, IndexMap, PixelType};
use crate::volume::{Volume, VolumeData, VolumeError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ResampleError {
    #[snafu(display("unsupported array input: expected 3 dimensions, found {}", ndim))]
    UnsupportedArray { ndim: usize },

    #[snafu(display("could not load {} image from {}", role, path.display()))]
    LoadImage {
        role: &'static str,
        path: PathBuf,
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display(
        "source grid cannot be inverted (spacing {:?}, direction {:?})",
        spacing,
        direction
    ))]
    DegenerateGeometry {
        spacing: [f64; 3],
        direction: [f64; 9],
    },

    #[snafu(display("error building resampled volume: {}", source))]
    BuildVolume {
        #[snafu(source(from(VolumeError, Box::new)))]
        source: Box<VolumeError>,
    },
}

/// Interpolation kernel used to evaluate the source between voxel centres
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Interpolator {
    #[default]
    Linear,
    NearestNeighbor,
    CatmullRom,
}

impl fmt::Display for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interpolator::Linear => "linear",
            Interpolator::NearestNeighbor => "nearest-neighbor",
            Interpolator::CatmullRom => "catmull-rom",
        };
        write!(f, "{name}")
    }
}

impl Interpolator {
    /// Pixel type of resampled output. Nearest neighbour keeps label values intact and
    /// produces 8-bit masks, every other kernel produces 32-bit floats.
    pub fn output_pixel_type(&self) -> PixelType {
        match self {
            Interpolator::NearestNeighbor => PixelType::UInt8,
            Interpolator::Linear | Interpolator::CatmullRom => PixelType::Float32,
        }
    }

    /// Evaluate `data` (shaped z, y, x) at a continuous (x, y, z) index.
    /// Returns `None` outside the half-voxel border around the grid.
    pub fn sample(&self, data: &Array3<f64>, index: [f64; 3]) -> Option<f64> {
        let (nz, ny, nx) = data.dim();
        let size = [nx, ny, nz];
        let inside = index
            .iter()
            .zip(size.iter())
            .all(|(&i, &n)| i >= -0.5 && i < n as f64 - 0.5);
        if !inside {
            return None;
        }

        let value = match self {
            Interpolator::NearestNeighbor => {
                let [x, y, z] = [0, 1, 2].map(|axis| clamp(round_half_up(index[axis]), size[axis]));
                data[[z, y, x]]
            }
            Interpolator::Linear => {
                let [wx, wy, wz] = [0, 1, 2].map(|axis| linear_weights(index[axis], size[axis]));
                weighted_sum(data, &wx, &wy, &wz)
            }
            Interpolator::CatmullRom => {
                let [wx, wy, wz] = [0, 1, 2].map(|axis| cubic_weights(index[axis], size[axis]));
                weighted_sum(data, &wx, &wy, &wz)
            }
        };
        Some(value)
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn clamp(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64 - 1) as usize
}

/// Neighbour indices and weights along one axis, indices clamped to the grid
fn linear_weights(position: f64, len: usize) -> Vec<(usize, f64)> {
    let base = position.floor();
    let t = position - base;
    let base = base as i64;
    vec![(clamp(base, len), 1.0 - t), (clamp(base + 1, len), t)]
}

fn cubic_weights(position: f64, len: usize) -> Vec<(usize, f64)> {
    let base = position.floor();
    let t = position - base;
    let base = base as i64;
    let (t2, t3) = (t * t, t * t * t);
    let weights = [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ];
    (-1..=2)
        .zip(weights)
        .map(|(offset, w)| (clamp(base + offset, len), w))
        .collect()
}

fn weighted_sum(
    data: &Array3<f64>,
    wx: &[(usize, f64)],
    wy: &[(usize, f64)],
    wz: &[(usize, f64)],
) -> f64 {
    let mut sum = 0.0;
    for &(z, fz) in wz {
        for &(y, fy) in wy {
            for &(x, fx) in wx {
                sum += fz * fy * fx * data[[z, y, x]];
            }
        }
    }
    sum
}

/// Source volume to be resampled
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// MetaImage file to load
    Path(PathBuf),
    /// Raw voxel array shaped (z, y, x), wrapped with default geometry
    Array(ArrayD<f64>),
    Image(Volume),
}

impl ImageSource {
    pub fn into_volume(self) -> Result<Volume, ResampleError> {
        match self {
            ImageSource::Path(path) => read_mha(&path).context(LoadImageSnafu {
                role: "source",
                path,
            }),
            ImageSource::Array(array) => {
                let ndim = array.ndim();
                let array = array
                    .into_dimensionality::<Ix3>()
                    .ok()
                    .context(UnsupportedArraySnafu { ndim })?;
                Ok(Volume::from_array(array))
            }
            ImageSource::Image(volume) => Ok(volume),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<ArrayD<f64>> for ImageSource {
    fn from(array: ArrayD<f64>) -> Self {
        ImageSource::Array(array)
    }
}

impl From<Array3<f64>> for ImageSource {
    fn from(array: Array3<f64>) -> Self {
        ImageSource::Array(array.into_dyn())
    }
}

impl From<Volume> for ImageSource {
    fn from(volume: Volume) -> Self {
        ImageSource::Image(volume)
    }
}

/// Volume whose grid the output is sampled on
#[derive(Debug, Clone)]
pub enum TargetSource {
    Path(PathBuf),
    Image(Volume),
}

impl TargetSource {
    pub fn into_volume(self) -> Result<Volume, ResampleError> {
        match self {
            TargetSource::Path(path) => read_mha(&path).context(LoadImageSnafu {
                role: "target",
                path,
            }),
            TargetSource::Image(volume) => Ok(volume),
        }
    }
}

impl From<PathBuf> for TargetSource {
    fn from(path: PathBuf) -> Self {
        TargetSource::Path(path)
    }
}

impl From<&Path> for TargetSource {
    fn from(path: &Path) -> Self {
        TargetSource::Path(path.to_path_buf())
    }
}

impl From<Volume> for TargetSource {
    fn from(volume: Volume) -> Self {
        TargetSource::Image(volume)
    }
}

/// Samples volumes onto a fixed output grid
#[derive(Debug, Clone, PartialEq)]
pub struct Resampler {
    geometry: Geometry,
    interpolator: Interpolator,
    default_value: f64,
}

impl Resampler {
    pub fn new(geometry: Geometry, interpolator: Interpolator) -> Self {
        Self {
            geometry,
            interpolator,
            default_value: 0.0,
        }
    }

    /// Output grid taken from the origin, spacing, direction and size of `reference`
    pub fn from_reference(reference: &Volume, interpolator: Interpolator) -> Self {
        Self::new(*reference.geometry(), interpolator)
    }

    /// Value assigned to output voxels that fall outside the source
    pub fn with_default_value(self, default_value: f64) -> Self {
        Self {
            default_value,
            ..self
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn interpolator(&self) -> Interpolator {
        self.interpolator
    }

    pub fn output_pixel_type(&self) -> PixelType {
        self.interpolator.output_pixel_type()
    }

    pub fn execute(&self, source: &Volume) -> Result<Volume, ResampleError> {
        self.resample(source, None)
    }

    /// Like `execute`, but with a progress bar over output slices.
    pub fn execute_with_progress(&self, source: &Volume) -> Result<Volume, ResampleError> {
        let bar = default_bar(self.geometry.size[2] as u64);
        bar.set_message(format!("Resampling ({})", self.interpolator));
        self.resample(source, Some(bar))
    }

    fn resample(&self, source: &Volume, bar: Option<ProgressBar>) -> Result<Volume, ResampleError> {
        let to_source = IndexMap::between(&self.geometry, source.geometry()).context(
            DegenerateGeometrySnafu {
                spacing: source.spacing(),
                direction: source.direction(),
            },
        )?;
        debug!(
            "Resampling {:?} {} onto {:?} with {} interpolation",
            source.size(),
            source.pixel_type(),
            self.geometry.size,
            self.interpolator
        );

        let values = source.data().to_f64();
        let mut samples = Array3::<f64>::zeros(self.geometry.shape());
        let sample_slice = |(z, mut slice): (usize, ArrayViewMut2<'_, f64>)| {
            for ((y, x), sample) in slice.indexed_iter_mut() {
                let index = to_source.apply([x as f64, y as f64, z as f64]);
                *sample = self
                    .interpolator
                    .sample(&values, index)
                    .unwrap_or(self.default_value);
            }
        };
        let slices = samples.axis_iter_mut(Axis(0)).into_par_iter().enumerate();
        match bar {
            Some(bar) => slices.progress_with(bar).for_each(sample_slice),
            None => slices.for_each(sample_slice),
        }

        let data = VolumeData::from_samples(samples, self.output_pixel_type());
        Volume::new(self.geometry, data).context(BuildVolumeSnafu)
    }
}

/// Resample `image` onto the grid of `target`.
///
/// Either argument may be a path, an in-memory volume, or (for `image`) a raw array.
/// Inputs are validated before any resampling happens. The result has exactly the
/// target's origin, spacing, direction and size, and the pixel type declared by
/// `interpolator`.
pub fn resample_to_reference<I, T>(
    image: I,
    target: T,
    interpolator: Interpolator,
) -> Result<Volume, ResampleError>
where
    I: Into<ImageSource>,
    T: Into<TargetSource>,
{
    let image = image.into().into_volume()?;
    let target = target.into().into_volume()?;
    Resampler::from_reference(&target, interpolator).execute(&image)
}
