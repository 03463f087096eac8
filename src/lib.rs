pub mod case;
pub mod errors;
pub mod file;
pub mod load;
pub mod manifest;
pub mod metadata;
pub mod save;
pub mod submission;
pub mod transform;
pub mod volume;

pub use case::*;
pub use metadata::*;
pub use submission::*;
pub use transform::*;
pub use volume::*;
