//! Configured entry point for the preparation steps

use super::{
    config::PreparationConfig, encoder, imputer, location, outlier, transforms, BinEdges,
    DistanceBins, FittedEncoders, OneHotEncoder,
};
use crate::error::Result;
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Runs the preparation steps with one shared configuration.
///
/// The steps are independent; the caller decides the order. The usual one
/// is `categorize_location`, then `fill_na_per_city` and
/// `handle_outliers_per_city` on each city's rows, then
/// `split_and_save_bins` and `encode_and_save_encoder` on the
/// concatenated table.
#[derive(Debug, Clone)]
pub struct ListingPreprocessor {
    config: PreparationConfig,
}

impl Default for ListingPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreparationConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreparationConfig) -> Self {
        Self { config }
    }

    /// Create a preprocessor after checking the configuration
    pub fn try_with_config(config: PreparationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &PreparationConfig {
        &self.config
    }

    pub fn categorize_location(&self, df: &DataFrame) -> Result<DataFrame> {
        timed("categorize_location", df, || {
            location::categorize_location(df, &self.config.grid, &self.config.schema)
        })
    }

    pub fn fill_na_in_type(&self, df: &DataFrame) -> Result<DataFrame> {
        timed("fill_na_in_type", df, || {
            imputer::fill_na_in_type(df, &self.config.schema)
        })
    }

    pub fn fill_na_per_city(&self, df: &DataFrame) -> Result<DataFrame> {
        timed("fill_na_per_city", df, || {
            imputer::fill_na_per_city(df, &self.config.fill, &self.config.schema)
        })
    }

    pub fn handle_outliers_per_city(&self, df: &DataFrame) -> Result<DataFrame> {
        timed("handle_outliers_per_city", df, || {
            outlier::handle_outliers_per_city(df, &self.config.outliers, &self.config.schema)
        })
    }

    pub fn split_into_bins(&self, df: &DataFrame, columns: &[&str]) -> Result<(DataFrame, BinEdges)> {
        timed("split_into_bins", df, || {
            transforms::split_into_bins(df, columns, self.config.n_bins)
        })
    }

    pub fn split_and_save_bins(&self, df: &DataFrame) -> Result<(DataFrame, DistanceBins)> {
        timed("split_and_save_bins", df, || {
            transforms::split_and_save_bins(
                df,
                self.config.n_bins,
                &self.config.outliers,
                &self.config.schema,
            )
        })
    }

    pub fn encode_city_column(&self, df: &DataFrame) -> Result<(DataFrame, OneHotEncoder)> {
        timed("encode_city_column", df, || {
            encoder::encode_city_column(df, &self.config.schema.city)
        })
    }

    pub fn encode_cat_columns(
        &self,
        df: &DataFrame,
        cat_columns: &[&str],
    ) -> Result<(DataFrame, OneHotEncoder)> {
        timed("encode_cat_columns", df, || encoder::encode_cat_columns(df, cat_columns))
    }

    pub fn encode_and_save_encoder(&self, df: &DataFrame) -> Result<(DataFrame, FittedEncoders)> {
        timed("encode_and_save_encoder", df, || {
            encoder::encode_and_save_encoder(df, &self.config.schema)
        })
    }
}

/// Output shape of a step, for the summary log line
trait StepOutput {
    fn frame(&self) -> &DataFrame;
}

impl StepOutput for DataFrame {
    fn frame(&self) -> &DataFrame {
        self
    }
}

impl<T> StepOutput for (DataFrame, T) {
    fn frame(&self) -> &DataFrame {
        &self.0
    }
}

fn timed<T: StepOutput>(step: &str, input: &DataFrame, run: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let output = run()?;
    let frame = output.frame();
    info!(
        step,
        rows = input.height(),
        columns_in = input.width(),
        columns_out = frame.width(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Preparation step finished"
    );
    Ok(output)
}
