//! Outlier handling by winsorization
//!
//! Values beyond a rank cut-off are replaced with the value at the cut-off,
//! so row count and ordering are preserved.

use super::{numeric_values, observed, put_numeric, require_column, ListingSchema, OutlierConfig};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Share of observed values clipped from each tail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinsorLimits {
    pub lower: f64,
    pub upper: f64,
}

impl WinsorLimits {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        for (name, limit) in [("lower", lower), ("upper", upper)] {
            if !(0.0..=1.0).contains(&limit) {
                return Err(PrepError::invalid(name, limit, "must lie in [0, 1]"));
            }
        }
        if lower + upper > 1.0 {
            return Err(PrepError::invalid(
                "lower + upper",
                lower + upper,
                "tails must not overlap",
            ));
        }
        Ok(Self { lower, upper })
    }

    /// Clip the upper tail only
    pub fn upper(upper: f64) -> Result<Self> {
        Self::new(0.0, upper)
    }

    /// Clip the lower tail only
    pub fn lower(lower: f64) -> Result<Self> {
        Self::new(lower, 0.0)
    }
}

/// Winsorize a column of values; missing values stay missing.
///
/// With n observed values sorted ascending, the lowest `floor(lower * n)`
/// take the value at that rank and the highest `floor(upper * n)` take the
/// value just below them. A cut that would consume every value is skipped.
pub fn winsorize(values: &[Option<f64>], limits: WinsorLimits) -> Vec<Option<f64>> {
    let mut sorted = observed(values);
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return values.to_vec();
    }

    let low_count = (limits.lower * n as f64) as usize;
    let high_count = (limits.upper * n as f64) as usize;

    let floor = (low_count > 0 && low_count < n).then(|| sorted[low_count]);
    let ceiling = (high_count > 0 && high_count < n).then(|| sorted[n - high_count - 1]);

    values
        .iter()
        .map(|v| {
            v.map(|x| {
                let x = floor.map_or(x, |f| x.max(f));
                ceiling.map_or(x, |c| x.min(c))
            })
        })
        .collect()
}

/// Winsorize one column of `df` in place
pub(crate) fn winsorize_column(df: &mut DataFrame, name: &str, limits: WinsorLimits) -> Result<()> {
    let dtype = require_column(df, name)?.dtype().clone();
    let values = numeric_values(df, name)?;
    let clipped = winsorize(&values, limits);

    let changed = values.iter().zip(clipped.iter()).filter(|(a, b)| a != b).count();
    debug!(column = %name, lower = limits.lower, upper = limits.upper, changed, "Winsorized column");

    put_numeric(df, name, clipped, &dtype)
}

/// Clip outliers of a single-city table and add the log price column.
///
/// `buildYear` is clipped from below by the share of all listings (missing
/// years included) built at or before the cutoff year; `squareMeters`, `poiCount` and `price_per_m2`
/// are clipped from above by fixed shares. `price_per_m2_log` is the natural
/// logarithm of the clipped price; non-positive prices yield `-inf`/NaN and
/// are reported, not corrected.
pub fn handle_outliers_per_city(
    df: &DataFrame,
    outliers: &OutlierConfig,
    schema: &ListingSchema,
) -> Result<DataFrame> {
    let mut result = df.clone();

    // Missing years count as not old, so they stay in the denominator
    let years = numeric_values(&result, &schema.build_year)?;
    let old_share = if years.is_empty() {
        0.0
    } else {
        years
            .iter()
            .filter(|year| matches!(year, Some(y) if *y <= outliers.build_year_cutoff))
            .count() as f64
            / years.len() as f64
    };
    winsorize_column(&mut result, &schema.build_year, WinsorLimits::lower(old_share)?)?;

    winsorize_column(
        &mut result,
        &schema.square_meters,
        WinsorLimits::upper(outliers.square_meters_upper)?,
    )?;
    winsorize_column(
        &mut result,
        &schema.poi_count,
        WinsorLimits::upper(outliers.poi_count_upper)?,
    )?;
    winsorize_column(
        &mut result,
        &schema.price_per_m2,
        WinsorLimits::upper(outliers.price_per_m2_upper)?,
    )?;

    let prices = numeric_values(&result, &schema.price_per_m2)?;
    let non_positive = prices.iter().flatten().filter(|&&p| p <= 0.0).count();
    if non_positive > 0 {
        warn!(
            column = %schema.price_per_m2,
            rows = non_positive,
            "Non-positive prices produce non-finite log values"
        );
    }
    let logs: Vec<Option<f64>> = prices.iter().map(|p| p.map(f64::ln)).collect();
    result.with_column(Series::new(schema.price_per_m2_log().into(), logs))?;

    Ok(result)
}
