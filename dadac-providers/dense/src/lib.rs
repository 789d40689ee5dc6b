//! Dense point clouds and raw images for dadac.
//!
//! Point clouds load from in-memory rows, headerless little-endian float
//! files or Parquet `FixedSizeList` columns; images load from a raw value
//! file and an `i32` mask.

mod errors;
mod image;
mod ingest;
mod provider;
mod raw;

pub use errors::DenseMatrixProviderError;
pub use image::RawImage;
pub use provider::DenseMatrixProvider;
pub use raw::Precision;

#[cfg(test)]
mod tests;
