//! Listing preprocessing module
//!
//! Cleaning and feature engineering steps for apartment listing tables:
//! - Spatial bucketing of coordinates into a location category
//! - Missing value imputation with grouped statistics
//! - Outlier clipping (winsorization) and log price
//! - Equal-width binning of distance columns
//! - One-hot encoding of categorical columns
//!
//! Every step takes a `DataFrame` and returns a new one. Steps that learn
//! parameters also return them ([`BinEdges`], [`OneHotEncoder`]) so the same
//! transformation can be replayed on held-out data.

mod config;
mod schema;
pub mod stats;
pub mod location;
pub mod imputer;
pub mod outlier;
pub mod transforms;
pub mod encoder;
mod pipeline;

pub use config::{PreparationConfig, GridConfig, OutlierConfig, FillConfig};
pub use schema::{ListingSchema, ColumnSelector};
pub use location::categorize_location;
pub use imputer::{fill_na_in_type, fill_na_per_city, ModeLookupChain};
pub use outlier::{winsorize, handle_outliers_per_city, WinsorLimits};
pub use transforms::{split_into_bins, split_and_save_bins, BinEdges, DistanceBins, BINNED_SUFFIX};
pub use encoder::{
    encode_city_column, encode_cat_columns, encode_and_save_encoder,
    OneHotEncoder, DropPolicy, FittedEncoders,
};
pub use pipeline::ListingPreprocessor;

use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Broad data type of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Boolean,
    /// Text held as `String`, `Categorical` or `Enum`
    Categorical,
    Unknown,
}

impl ColumnType {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_primitive_numeric() {
            ColumnType::Numeric
        } else if matches!(dtype, DataType::Boolean) {
            ColumnType::Boolean
        } else if matches!(
            dtype,
            DataType::String | DataType::Categorical(_, _) | DataType::Enum(_, _)
        ) {
            ColumnType::Categorical
        } else {
            ColumnType::Unknown
        }
    }
}

/// Look up a column, mapping absence to `FeatureNotFound`
pub(crate) fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PrepError::FeatureNotFound(name.to_string()))
}

/// Values of a numeric column as `f64`, nulls preserved
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, name)?;
    if ColumnType::of(series.dtype()) != ColumnType::Numeric {
        return Err(PrepError::DataError(format!(
            "column '{}' is {:?}, expected a numeric column",
            name,
            series.dtype()
        )));
    }
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Values of a text or categorical column as strings, nulls preserved
pub(crate) fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = require_column(df, name)?;
    if ColumnType::of(series.dtype()) != ColumnType::Categorical {
        return Err(PrepError::DataError(format!(
            "column '{}' is {:?}, expected a text column",
            name,
            series.dtype()
        )));
    }
    let series = series.cast(&DataType::String)?;
    Ok(series.str()?.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

/// Non-null values only
pub(crate) fn observed(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Replace (or append) a numeric column, casting back to `dtype`
pub(crate) fn put_numeric(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<f64>>,
    dtype: &DataType,
) -> Result<()> {
    let series = Series::new(name.into(), values);
    let series = if dtype.is_primitive_numeric() && dtype != &DataType::Float64 {
        series.cast(dtype)?
    } else {
        series
    };
    df.with_column(series)?;
    Ok(())
}

/// Replace (or append) a text column, casting back to a categorical `dtype`
pub(crate) fn put_text(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<String>>,
    dtype: &DataType,
) -> Result<()> {
    let series = Series::new(name.into(), values);
    let series = match dtype {
        DataType::Categorical(_, ordering) => {
            series.cast(&DataType::Categorical(None, *ordering))?
        }
        DataType::Enum(_, _) => series.cast(dtype)?,
        _ => series,
    };
    df.with_column(series)?;
    Ok(())
}

/// Values as a polars float array, nulls preserved
pub(crate) fn float_chunked(values: &[Option<f64>]) -> Float64Chunked {
    values.iter().copied().collect()
}

/// Names of text and categorical columns in table order
pub fn text_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| ColumnType::of(c.dtype()) == ColumnType::Categorical)
        .map(|c| c.name().to_string())
        .collect()
}
