pub mod mha;

pub use mha::MhaError;
