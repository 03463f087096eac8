use clap::Parser;
use isles_adapter::errors::MhaError;
use isles_adapter::file::MhaFileOperations;
use isles_adapter::save::MhaWriter;
use isles_adapter::transform::resample::{Interpolator, ResampleError, Resampler};
use isles_adapter::volume::Volume;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Invalid source path: {}", path.display()))]
    InvalidSourcePath { path: PathBuf },

    #[snafu(display("Invalid target path: {}", path.display()))]
    InvalidTargetPath { path: PathBuf },

    #[snafu(display("IO error: {:?}", source))]
    IO {
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("Error reading MetaImage: {:?}", source))]
    MhaRead {
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("Error writing MetaImage: {:?}", source))]
    MhaWrite {
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("Error resampling: {:?}", source))]
    Resample {
        #[snafu(source(from(ResampleError, Box::new)))]
        source: Box<ResampleError>,
    },
}

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "Resample a MetaImage volume onto the voxel grid of another",
    long_about = None
)]
struct Args {
    #[arg(help = "MetaImage file to resample")]
    source: PathBuf,

    #[arg(help = "MetaImage file whose origin, spacing, direction and size define the output grid")]
    target: PathBuf,

    #[arg(help = "Output MetaImage file")]
    output: PathBuf,

    #[arg(
        help = "Interpolation kernel. Nearest neighbor writes 8-bit output, the others 32-bit floats",
        long = "interpolator",
        short = 'f',
        value_parser = clap::value_parser!(Interpolator),
        default_value_t = Interpolator::default(),
    )]
    interpolator: Interpolator,

    #[arg(
        help = "Compress the output with zlib",
        long = "compress",
        default_value_t = false
    )]
    compress: bool,

    #[arg(
        help = "Enable verbose logging",
        long = "verbose",
        short = 'v',
        default_value = "false"
    )]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(level)
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    run(args).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-1);
    });
}

fn validate_args(args: &Args) -> Result<(), Error> {
    if !args.source.is_metaimage_file() {
        return Err(Error::InvalidSourcePath {
            path: args.source.clone(),
        });
    }
    if !args.target.is_metaimage_file() {
        return Err(Error::InvalidTargetPath {
            path: args.target.clone(),
        });
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context(IOSnafu)?;
    }
    Ok(())
}

fn resample_file(
    source: &Path,
    target: &Path,
    output: &Path,
    interpolator: Interpolator,
    writer: &MhaWriter,
) -> Result<Volume, Error> {
    let source_volume = source.read_mha().context(MhaReadSnafu)?;
    let target_volume = target.read_mha().context(MhaReadSnafu)?;
    info!(
        "Resampling {} onto the grid of {}",
        source.display(),
        target.display()
    );

    let resampled = Resampler::from_reference(&target_volume, interpolator)
        .execute_with_progress(&source_volume)
        .context(ResampleSnafu)?;
    writer.write(&resampled, output).context(MhaWriteSnafu)?;
    info!("Wrote {}", output.display());
    Ok(resampled)
}

fn run(args: Args) -> Result<Volume, Error> {
    validate_args(&args)?;
    let writer = MhaWriter::new().with_compression(args.compress);
    resample_file(
        &args.source,
        &args.target,
        &args.output,
        args.interpolator,
        &writer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use isles_adapter::metadata::{Geometry, PixelType};
    use isles_adapter::volume::VolumeData;
    use ndarray::Array3;
    use rstest::rstest;
    use tempfile::TempDir;

    fn write_volume(path: &Path, volume: &Volume) -> PathBuf {
        MhaWriter::new().write(volume, path).unwrap();
        path.to_path_buf()
    }

    fn args(source: PathBuf, target: PathBuf, output: PathBuf, interpolator: Interpolator) -> Args {
        Args {
            source,
            target,
            output,
            interpolator,
            compress: false,
            verbose: false,
        }
    }

    #[rstest]
    #[case(Interpolator::Linear, PixelType::Float32)]
    #[case(Interpolator::NearestNeighbor, PixelType::UInt8)]
    #[case(Interpolator::CatmullRom, PixelType::Float32)]
    fn test_resample_onto_target(#[case] interpolator: Interpolator, #[case] expected: PixelType) {
        let tmp_dir = TempDir::new().unwrap();
        let array = Array3::from_shape_fn((8, 8, 8), |(z, y, x)| (x + y + z) as i16);
        let source = write_volume(
            &tmp_dir.path().join("source.mha"),
            &Volume::from_array(array),
        );
        let target_geometry = Geometry::new([4, 4, 4])
            .with_spacing([2.0, 2.0, 2.0])
            .with_origin([0.5, 0.5, 0.5]);
        let target = write_volume(
            &tmp_dir.path().join("target.mha"),
            &Volume::zeros(target_geometry, PixelType::Int16),
        );
        let output = tmp_dir.path().join("nested").join("output.mha");

        let result = run(args(source, target, output.clone(), interpolator)).unwrap();

        let written = output.read_mha().unwrap();
        assert_eq!(written, result);
        assert_eq!(written.geometry(), &target_geometry);
        assert_eq!(written.pixel_type(), expected);
    }

    #[test]
    fn test_linear_values() {
        let tmp_dir = TempDir::new().unwrap();
        let array = Array3::from_shape_fn((2, 2, 2), |(z, _, _)| (10 * z) as u8);
        let source = write_volume(
            &tmp_dir.path().join("source.mha"),
            &Volume::from_array(array),
        );
        let target = write_volume(
            &tmp_dir.path().join("target.mha"),
            &Volume::zeros(
                Geometry::new([1, 1, 1]).with_origin([0.0, 0.0, 0.5]),
                PixelType::UInt8,
            ),
        );

        let result = run(args(
            source,
            target,
            tmp_dir.path().join("output.mha"),
            Interpolator::Linear,
        ))
        .unwrap();

        assert_eq!(
            result.data(),
            &VolumeData::Float32(Array3::from_elem((1, 1, 1), 5.0))
        );
    }

    #[test]
    fn test_detached_header_source() {
        let tmp_dir = TempDir::new().unwrap();
        let source = tmp_dir.path().join("source.mhd");
        std::fs::write(
            &source,
            "NDims = 3\nDimSize = 2 1 1\nElementType = MET_UCHAR\nElementDataFile = source.raw\n",
        )
        .unwrap();
        std::fs::write(tmp_dir.path().join("source.raw"), [3u8, 9]).unwrap();
        let target = write_volume(
            &tmp_dir.path().join("target.mha"),
            &Volume::zeros(Geometry::new([2, 1, 1]), PixelType::UInt8),
        );

        let result = run(args(
            source,
            target,
            tmp_dir.path().join("output.mha"),
            Interpolator::NearestNeighbor,
        ))
        .unwrap();

        assert_eq!(
            result.data(),
            &VolumeData::UInt8(Array3::from_shape_vec((1, 1, 2), vec![3, 9]).unwrap())
        );
    }

    #[test]
    fn test_invalid_source_path() {
        let tmp_dir = TempDir::new().unwrap();
        let target = write_volume(
            &tmp_dir.path().join("target.mha"),
            &Volume::zeros(Geometry::new([2, 2, 2]), PixelType::UInt8),
        );
        let result = run(args(
            tmp_dir.path().join("missing.mha"),
            target,
            tmp_dir.path().join("output.mha"),
            Interpolator::Linear,
        ));
        assert!(matches!(result, Err(Error::InvalidSourcePath { .. })));
    }

    #[test]
    fn test_invalid_target_path() {
        let tmp_dir = TempDir::new().unwrap();
        let source = write_volume(
            &tmp_dir.path().join("source.mha"),
            &Volume::zeros(Geometry::new([2, 2, 2]), PixelType::UInt8),
        );
        let result = run(args(
            source,
            tmp_dir.path().join("target.nii"),
            tmp_dir.path().join("output.mha"),
            Interpolator::Linear,
        ));
        assert!(matches!(result, Err(Error::InvalidTargetPath { .. })));
    }

    #[test]
    fn test_corrupt_source() {
        let tmp_dir = TempDir::new().unwrap();
        let source = tmp_dir.path().join("source.mha");
        std::fs::write(&source, b"NDims = 3\nElementDataFile = LOCAL\n").unwrap();
        let target = write_volume(
            &tmp_dir.path().join("target.mha"),
            &Volume::zeros(Geometry::new([2, 2, 2]), PixelType::UInt8),
        );
        let result = run(args(
            source,
            target,
            tmp_dir.path().join("output.mha"),
            Interpolator::Linear,
        ));
        assert!(matches!(result, Err(Error::MhaRead { .. })));
    }
}
