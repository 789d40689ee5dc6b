//! Helpers for ingesting fixed-size list arrays into dense `f64` buffers.
use arrow_array::{Array, FixedSizeListArray, Float32Array, Float64Array};
use arrow_schema::{DataType, Field};

use crate::errors::DenseMatrixProviderError;

fn is_float(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Float32 | DataType::Float64)
}

fn list_width(width: i32) -> Result<usize, DenseMatrixProviderError> {
    usize::try_from(width)
        .ok()
        .filter(|&dimension| dimension > 0)
        .ok_or(DenseMatrixProviderError::InvalidDimension { actual: width })
}

pub(crate) fn validate_fixed_size_list_field(
    field: &Field,
    column: &str,
) -> Result<usize, DenseMatrixProviderError> {
    match field.data_type() {
        DataType::FixedSizeList(child, width) => {
            if field.is_nullable() || child.is_nullable() {
                return Err(DenseMatrixProviderError::NullableField {
                    column: column.to_owned(),
                    nullable_child: child.is_nullable(),
                });
            }
            if !is_float(child.data_type()) {
                return Err(DenseMatrixProviderError::InvalidListValueType {
                    actual: child.data_type().clone(),
                });
            }
            list_width(*width)
        }
        other => Err(DenseMatrixProviderError::InvalidColumnType {
            column: column.to_owned(),
            actual: other.clone(),
        }),
    }
}

pub(crate) fn append_fixed_size_list_values(
    array: &FixedSizeListArray,
    expected_dimension: Option<usize>,
    start_row: usize,
    out: &mut Vec<f64>,
) -> Result<usize, DenseMatrixProviderError> {
    let dimension = validate_fixed_size_list(array)?;
    if let Some(expected) = expected_dimension.filter(|&expected| expected != dimension) {
        return Err(DenseMatrixProviderError::InconsistentBatchDimension {
            expected,
            actual: dimension,
        });
    }
    copy_list_values(array, dimension, start_row, out)?;
    Ok(dimension)
}

pub(crate) fn validate_fixed_size_list(
    array: &FixedSizeListArray,
) -> Result<usize, DenseMatrixProviderError> {
    let value_type = array.value_type();
    if !is_float(&value_type) {
        return Err(DenseMatrixProviderError::InvalidListValueType { actual: value_type });
    }
    list_width(array.value_length())
}

/// Values of one list row widened to `f64`.
fn row_values(row: &dyn Array) -> Result<Vec<Option<f64>>, DenseMatrixProviderError> {
    if let Some(floats) = row.as_any().downcast_ref::<Float32Array>() {
        return Ok(floats.iter().map(|value| value.map(f64::from)).collect());
    }
    if let Some(doubles) = row.as_any().downcast_ref::<Float64Array>() {
        return Ok(doubles.iter().collect());
    }
    Err(DenseMatrixProviderError::InvalidListValueType {
        actual: row.data_type().clone(),
    })
}

pub(crate) fn copy_list_values(
    array: &FixedSizeListArray,
    dimension: usize,
    start_row: usize,
    out: &mut Vec<f64>,
) -> Result<(), DenseMatrixProviderError> {
    let rows = array.len();
    let additional = rows
        .checked_mul(dimension)
        .ok_or(DenseMatrixProviderError::CapacityOverflow { rows, dimension })?;
    out.reserve(additional);
    for row_index in 0..rows {
        let absolute_row = start_row + row_index;
        if array.is_null(row_index) {
            return Err(DenseMatrixProviderError::NullRow { row: absolute_row });
        }
        let values = row_values(array.value(row_index).as_ref())?;
        if values.len() != dimension {
            return Err(DenseMatrixProviderError::InvalidRowLength {
                row: absolute_row,
                expected: dimension,
                actual: values.len(),
            });
        }
        for (value_index, value) in values.into_iter().enumerate() {
            let value = value.ok_or(DenseMatrixProviderError::NullValue {
                row: absolute_row,
                value_index,
            })?;
            if !value.is_finite() {
                return Err(DenseMatrixProviderError::NonFiniteValue {
                    row: absolute_row,
                    value_index,
                });
            }
            out.push(value);
        }
    }
    Ok(())
}
