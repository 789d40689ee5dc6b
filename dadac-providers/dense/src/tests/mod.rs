pub(crate) use super::{DenseMatrixProvider, DenseMatrixProviderError, Precision, RawImage};

mod image;
mod support;
