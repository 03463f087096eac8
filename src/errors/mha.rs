pub use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MhaError {
    #[snafu(display("IO error on MetaImage file {}", path.display()))]
    IOError {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("error reading MetaImage header: {:?}", source))]
    ReadHeaderLine {
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("invalid MetaImage header in {}: {}", path.display(), source))]
    InvalidHeader {
        path: PathBuf,
        #[snafu(source(from(MhaError, Box::new)))]
        source: Box<MhaError>,
    },

    #[snafu(display("malformed MetaImage header line: '{}'", line))]
    MalformedLine { line: String },

    #[snafu(display("missing MetaImage header key: {}", key))]
    MissingKey { key: &'static str },

    #[snafu(display("invalid value for MetaImage header key '{}': '{}'", key, value))]
    InvalidValue { key: String, value: String },

    #[snafu(display("unsupported MetaImage element type: '{}'", value))]
    UnsupportedElementType { value: String },

    #[snafu(display("unsupported number of dimensions: {} (expected 2 or 3)", ndims))]
    UnsupportedDimensions { ndims: usize },

    #[snafu(display("unsupported number of channels: {} (expected 1)", channels))]
    UnsupportedChannels { channels: usize },

    #[snafu(display(
        "MetaImage data size mismatch: expected {} bytes, found {}",
        expected,
        actual
    ))]
    DataSizeMismatch { expected: usize, actual: usize },

    #[snafu(display("error decompressing MetaImage data in {}", path.display()))]
    Decompress {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("error compressing MetaImage data for {}", path.display()))]
    Compress {
        path: PathBuf,
        #[snafu(source(from(std::io::Error, Box::new)))]
        source: Box<std::io::Error>,
    },

    #[snafu(display("error shaping MetaImage data: {:?}", source))]
    InvalidShape {
        #[snafu(source(from(ndarray::ShapeError, Box::new)))]
        source: Box<ndarray::ShapeError>,
    },
}
