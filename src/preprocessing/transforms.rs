//! Equal-width binning of numeric columns
//!
//! Edges are shared by every column binned together and returned as a
//! [`BinEdges`] value so the same cut can be applied to new data.

use super::outlier::{winsorize_column, WinsorLimits};
use super::{numeric_values, observed, ListingSchema, OutlierConfig};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Suffix of the column holding a bin index
pub const BINNED_SUFFIX: &str = "_binned";

/// Ordered bin boundaries; `n` bins have `n + 1` edges.
///
/// Serialised as a plain list; deserialising checks the edges increase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BinEdges(Vec<f64>);

impl TryFrom<Vec<f64>> for BinEdges {
    type Error = PrepError;

    fn try_from(edges: Vec<f64>) -> Result<Self> {
        Self::from_edges(edges)
    }
}

impl From<BinEdges> for Vec<f64> {
    fn from(edges: BinEdges) -> Self {
        edges.0
    }
}

impl BinEdges {
    /// Evenly spaced edges from 0 to `max`
    pub fn uniform(max: f64, n_bins: usize) -> Result<Self> {
        if n_bins == 0 {
            return Err(PrepError::invalid("n_bins", n_bins, "must be positive"));
        }
        if !max.is_finite() || max <= 0.0 {
            return Err(PrepError::invalid(
                "max",
                max,
                "bin edges from 0 must increase monotonically",
            ));
        }

        let step = max / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| i as f64 * step).collect();
        edges.push(max);
        Ok(Self(edges))
    }

    /// Edges from an explicit, strictly increasing sequence
    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(PrepError::invalid("edges", edges.len(), "need at least two edges"));
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(PrepError::invalid("edges", format!("{:?}", edges), "must increase"));
        }
        Ok(Self(edges))
    }

    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// Zero-based bin of `value`.
    ///
    /// Bins are closed on the right, `(e[i], e[i+1]]`, and the first bin
    /// also includes the lowest edge. Values outside the edges have no bin.
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.first() || value > self.last() {
            return None;
        }
        Some(self.0.partition_point(|&e| e < value).saturating_sub(1))
    }

    /// Replace each column with a `<column>_binned` index column.
    ///
    /// Index columns are appended in the order given and the originals
    /// dropped.
    pub fn apply(&self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        let mut result = df.clone();
        for col in columns {
            let bins: Vec<Option<i64>> = numeric_values(df, col)?
                .into_iter()
                .map(|v| v.and_then(|x| self.bin_of(x)).map(|b| b as i64))
                .collect();
            let name = format!("{}{}", col, BINNED_SUFFIX);
            result.with_column(Series::new(name.into(), bins))?;
        }
        Ok(result.drop_many(columns.iter().copied()))
    }
}

/// Cut `columns` into equal-width bins shared by all of them.
///
/// The edges run from 0 to the largest value found in any of the columns.
pub fn split_into_bins(
    df: &DataFrame,
    columns: &[&str],
    n_bins: usize,
) -> Result<(DataFrame, BinEdges)> {
    if columns.is_empty() {
        return Err(PrepError::invalid("columns", "[]", "nothing to bin"));
    }

    let mut max: Option<(f64, &str)> = None;
    for col in columns {
        let col_max = observed(&numeric_values(df, col)?)
            .into_iter()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
        if let Some(m) = col_max {
            if max.map_or(true, |(best, _)| m > best) {
                max = Some((m, *col));
            }
        }
    }
    let (max, max_column) = max.ok_or_else(|| PrepError::EmptyColumn(columns.join(", ")))?;

    let edges = BinEdges::uniform(max, n_bins)?;
    debug!(columns = ?columns, max_column, max, n_bins, "Computed shared bin edges");

    let result = edges.apply(df, columns)?;
    Ok((result, edges))
}

/// Fitted edges for the distance columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBins {
    /// Edges shared by every distance column except the centre distance
    pub distance_bins: BinEdges,
    /// Edges for the (clipped) centre distance
    pub centre_distance_bins: BinEdges,
}

impl DistanceBins {
    /// Replay the fitted cut on new data.
    ///
    /// The centre distance is capped at its last fitted edge first, as the
    /// fit clipped it before cutting.
    pub fn apply(&self, df: &DataFrame, schema: &ListingSchema) -> Result<DataFrame> {
        let others = other_distance_columns(df, schema)?;
        let others: Vec<&str> = others.iter().map(|c| c.as_str()).collect();
        let result = self.distance_bins.apply(df, &others)?;

        let cap = self.centre_distance_bins.last();
        let centre = &schema.centre_distance;
        let capped: Vec<Option<f64>> = numeric_values(&result, centre)?
            .into_iter()
            .map(|v| v.map(|x| x.min(cap)))
            .collect();
        let mut result = result;
        result.with_column(Series::new(centre.as_str().into(), capped))?;

        self.centre_distance_bins.apply(&result, &[centre.as_str()])
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Distance columns other than the centre distance, which must be present
fn other_distance_columns(df: &DataFrame, schema: &ListingSchema) -> Result<Vec<String>> {
    let mut columns = schema.distance_columns(df);
    let before = columns.len();
    columns.retain(|c| c != &schema.centre_distance);
    if columns.len() == before {
        return Err(PrepError::FeatureNotFound(schema.centre_distance.clone()));
    }
    Ok(columns)
}

/// Bin all distance columns of the merged dataset.
///
/// The centre distance spans a much wider range than the other distances,
/// so it is clipped from above and binned on its own edges.
pub fn split_and_save_bins(
    df: &DataFrame,
    n_bins: usize,
    outliers: &OutlierConfig,
    schema: &ListingSchema,
) -> Result<(DataFrame, DistanceBins)> {
    let others = other_distance_columns(df, schema)?;
    let others: Vec<&str> = others.iter().map(|c| c.as_str()).collect();
    let (mut result, distance_bins) = split_into_bins(df, &others, n_bins)?;

    let centre = schema.centre_distance.as_str();
    winsorize_column(&mut result, centre, WinsorLimits::upper(outliers.centre_distance_upper)?)?;
    let (result, centre_distance_bins) = split_into_bins(&result, &[centre], n_bins)?;

    Ok((
        result,
        DistanceBins {
            distance_bins,
            centre_distance_bins,
        },
    ))
}
