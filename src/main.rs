use clap::Parser;
use snafu::{Report, ResultExt, Snafu, Whatever};
use std::path::PathBuf;
use tracing::{error, info, Level};

use isles_adapter::submission::{RunSummary, Submission, SubmissionError, DEFAULT_IMAGES_ROOT};

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Invalid output path: {}", path.display()))]
    InvalidOutputPath { path: PathBuf },

    #[snafu(display("Failed to create directory: {}", path.display()))]
    CreateDir {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("Submission failed: {}", source))]
    Submission {
        #[snafu(source(from(SubmissionError, Box::new)))]
        source: Box<SubmissionError>,
    },
}

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "Write a stroke lesion prediction as an ISLES22 submission aligned to the case's DWI scan",
    long_about = None
)]
struct Args {
    #[arg(
        help = "Folder holding the prediction (.mha). An empty mask is written if none is found",
        long = "input-folder",
        short = 'i'
    )]
    input_folder: PathBuf,

    #[arg(
        help = "Folder receiving the mask and result.json. Created if absent",
        long = "output-folder",
        short = 'o'
    )]
    output_folder: PathBuf,

    #[arg(
        help = "Folder holding the dwi-brain-mri, adc-brain-mri and flair-brain-mri scan folders",
        long = "images-root",
        default_value = DEFAULT_IMAGES_ROOT
    )]
    images_root: PathBuf,

    #[arg(
        help = "Compress the written mask with zlib",
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
        Level::WARN
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
    if !args.output_folder.exists() {
        std::fs::create_dir_all(&args.output_folder).context(CreateDirSnafu {
            path: args.output_folder.clone(),
        })?;
    } else if !args.output_folder.is_dir() {
        return Err(Error::InvalidOutputPath {
            path: args.output_folder.clone(),
        });
    }
    Ok(())
}

fn run(args: Args) -> Result<RunSummary, Error> {
    validate_args(&args)?;
    let summary = Submission::new(&args.input_folder, &args.output_folder)
        .with_images_root(&args.images_root)
        .with_compression(args.compress)
        .run()
        .context(SubmissionSnafu)?;
    match &summary.prediction {
        Some(path) => info!(
            "Submitted {} as {}",
            path.display(),
            summary.mask_path.display()
        ),
        None => info!("Submitted empty mask as {}", summary.mask_path.display()),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use isles_adapter::case::Modality;
    use isles_adapter::load::read_mha;
    use isles_adapter::manifest::{read_manifest, CaseResult};
    use isles_adapter::metadata::{Geometry, PixelType};
    use isles_adapter::save::MhaWriter;
    use isles_adapter::volume::{Volume, VolumeData};
    use ndarray::Array3;
    use rstest::rstest;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const DWI_FILENAME: &str = "sub-strokecase0042_ses-0001_dwi.mha";

    fn setup_images(root: &Path, geometry: Geometry) -> Volume {
        let reference = Volume::zeros(geometry, PixelType::Float32);
        for modality in Modality::ALL {
            let folder = root.join(modality.folder());
            fs::create_dir_all(&folder).unwrap();
            let name = match modality {
                Modality::Dwi => DWI_FILENAME.to_string(),
                other => format!("scan_{}.mha", other),
            };
            MhaWriter::new().write(&reference, folder.join(name)).unwrap();
        }
        reference
    }

    fn args(images: &Path, input: &Path, output: &Path) -> Args {
        Args {
            input_folder: input.to_path_buf(),
            output_folder: output.to_path_buf(),
            images_root: images.to_path_buf(),
            compress: false,
            verbose: false,
        }
    }

    #[test]
    fn test_missing_prediction() {
        let tmp_dir = TempDir::new().unwrap();
        let images = tmp_dir.path().join("images");
        let geometry = Geometry::new([112, 112, 72]).with_spacing([2.0, 2.0, 2.0]);
        let reference = setup_images(&images, geometry);
        let output = tmp_dir.path().join("output");

        let summary = run(args(&images, &tmp_dir.path().join("input"), &output)).unwrap();

        assert!(summary.used_fallback());
        let mask = read_mha(output.join(DWI_FILENAME)).unwrap();
        assert_eq!(mask.geometry(), reference.geometry());
        assert!(mask.data().is_all_zero());
        assert_eq!(
            read_manifest(output.join("result.json")).unwrap(),
            vec![CaseResult::lesion_segmentation(DWI_FILENAME)]
        );
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_prediction(#[case] compress: bool) {
        let tmp_dir = TempDir::new().unwrap();
        let images = tmp_dir.path().join("images");
        let geometry = Geometry::new([16, 12, 8])
            .with_spacing([0.9, 0.9, 3.0])
            .with_origin([10.0, -20.0, 5.0]);
        let reference = setup_images(&images, geometry);

        let input = tmp_dir.path().join("input");
        fs::create_dir(&input).unwrap();
        let labels = Array3::from_shape_fn(geometry.shape(), |(z, y, x)| ((x + y + z) % 2) as u8);
        let prediction = Volume::from_array(labels.clone());
        MhaWriter::new()
            .write(&prediction, input.join("output.mha"))
            .unwrap();

        let output = tmp_dir.path().join("output");
        let summary = run(Args {
            compress,
            ..args(&images, &input, &output)
        })
        .unwrap();

        assert_eq!(summary.prediction, Some(input.join("output.mha")));
        let mask = read_mha(output.join(DWI_FILENAME)).unwrap();
        assert_eq!(mask.geometry(), reference.geometry());
        assert_eq!(mask.data(), &VolumeData::UInt8(labels));
    }

    #[test]
    fn test_invalid_output_path() {
        let tmp_dir = TempDir::new().unwrap();
        let output = tmp_dir.path().join("output");
        fs::write(&output, b"").unwrap();

        let result = run(args(tmp_dir.path(), tmp_dir.path(), &output));
        assert!(matches!(result, Err(Error::InvalidOutputPath { .. })));
    }

    #[test]
    fn test_missing_scans() {
        let tmp_dir = TempDir::new().unwrap();
        let output = tmp_dir.path().join("output");

        let result = run(args(&tmp_dir.path().join("images"), tmp_dir.path(), &output));

        assert!(matches!(result, Err(Error::Submission { .. })));
        assert!(output.is_dir());
    }
}
