pub mod geometry;
pub use geometry::*;

pub mod header;
pub use header::*;

pub mod pixel_type;
pub use pixel_type::*;
