//! One-hot encoding of categorical columns

use super::{require_column, text_columns, ListingSchema};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which category, if any, is left without an indicator column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPolicy {
    /// One indicator per category
    None,
    /// The first (smallest) category is the reference level
    First,
}

/// Categories learned for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnCategories {
    column: String,
    categories: Vec<String>,
}

impl ColumnCategories {
    /// Categories that get an indicator column
    fn encoded(&self, drop: DropPolicy) -> &[String] {
        match drop {
            DropPolicy::None => &self.categories,
            DropPolicy::First => self.categories.get(1..).unwrap_or(&[]),
        }
    }
}

/// One-hot encoder.
///
/// Categories are the distinct non-missing values seen during `fit`, in
/// ascending order. At transform time, unknown and missing values encode as
/// all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop: DropPolicy,
    columns: Vec<ColumnCategories>,
    is_fitted: bool,
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new(drop: DropPolicy) -> Self {
        Self {
            drop,
            columns: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn drop_policy(&self) -> DropPolicy {
        self.drop
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learn the categories of `columns`
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut fitted = Vec::with_capacity(columns.len());
        for col_name in columns {
            let mut categories: Vec<String> =
                category_values(df, col_name)?.into_iter().flatten().collect();
            categories.sort();
            categories.dedup();

            debug!(column = %col_name, categories = categories.len(), "Fitted categories");
            fitted.push(ColumnCategories {
                column: col_name.to_string(),
                categories,
            });
        }

        self.columns = fitted;
        self.is_fitted = true;
        Ok(self)
    }

    /// Fitted categories of a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.categories.as_slice())
    }

    /// Names of the fitted input columns
    pub fn input_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    /// Names of the indicator columns `transform` produces, `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| {
                c.encoded(self.drop)
                    .iter()
                    .map(move |cat| format!("{}_{}", c.column, cat))
            })
            .collect()
    }

    /// Replace the fitted columns with their indicator columns
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        let mut result = df.clone();

        for fitted in &self.columns {
            let values = category_values(df, &fitted.column)?;

            // Create binary column for each category
            for category in fitted.encoded(self.drop) {
                let indicators: Vec<i32> = values
                    .iter()
                    .map(|v| i32::from(v.as_deref() == Some(category.as_str())))
                    .collect();
                let name = format!("{}_{}", fitted.column, category);
                result.with_column(Series::new(name.into(), indicators))?;
            }
        }

        Ok(result.drop_many(self.columns.iter().map(|c| c.column.as_str())))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }
}

/// Column values as text; non-text columns are cast
fn category_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = require_column(df, name)?;
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(series.str()?.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

/// One-hot encode the city column, keeping every city as its own indicator
pub fn encode_city_column(df: &DataFrame, city_column: &str) -> Result<(DataFrame, OneHotEncoder)> {
    let mut encoder = OneHotEncoder::new(DropPolicy::None);
    let result = encoder.fit_transform(df, &[city_column])?;
    Ok((result, encoder))
}

/// One-hot encode categorical columns, dropping the first category of each
pub fn encode_cat_columns(df: &DataFrame, cat_columns: &[&str]) -> Result<(DataFrame, OneHotEncoder)> {
    let mut encoder = OneHotEncoder::new(DropPolicy::First);
    let result = encoder.fit_transform(df, cat_columns)?;
    Ok((result, encoder))
}

/// Fitted encoders of the whole dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoders {
    pub city_encoder: OneHotEncoder,
    pub cat_column_encoder: OneHotEncoder,
}

impl FittedEncoders {
    /// Replay both encoders on new data, city first
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let result = self.city_encoder.transform(df)?;
        self.cat_column_encoder.transform(&result)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encode the city column, then every remaining text column.
///
/// The resulting table has no text columns left.
pub fn encode_and_save_encoder(
    df: &DataFrame,
    schema: &ListingSchema,
) -> Result<(DataFrame, FittedEncoders)> {
    let (result, city_encoder) = encode_city_column(df, &schema.city)?;

    let cat_columns = text_columns(&result);
    let cat_columns: Vec<&str> = cat_columns.iter().map(|c| c.as_str()).collect();
    let (result, cat_column_encoder) = encode_cat_columns(&result, &cat_columns)?;

    Ok((
        result,
        FittedEncoders {
            city_encoder,
            cat_column_encoder,
        },
    ))
}
