//! Listing Prep - data cleaning and feature engineering for apartment listings
//!
//! This crate prepares a table of apartment listings for price modelling:
//! - [`preprocessing::categorize_location`] - bucket coordinates into ~1 km² cells
//! - [`preprocessing::fill_na_per_city`] - grouped imputation of missing values
//! - [`preprocessing::handle_outliers_per_city`] - winsorization and log price
//! - [`preprocessing::split_and_save_bins`] - equal-width binning of distances
//! - [`preprocessing::encode_and_save_encoder`] - one-hot encoding
//!
//! Tables are polars `DataFrame`s. Steps that learn parameters return them
//! alongside the table so the caller can persist them and replay the same
//! transformation on new data.
//!
//! ```no_run
//! use listing_prep::prelude::*;
//! use polars::prelude::*;
//!
//! # fn run(city_rows: DataFrame) -> listing_prep::Result<()> {
//! let prep = ListingPreprocessor::new();
//! let df = prep.categorize_location(&city_rows)?;
//! let df = prep.fill_na_per_city(&df)?;
//! let df = prep.handle_outliers_per_city(&df)?;
//! let (df, bins) = prep.split_and_save_bins(&df)?;
//! let (df, encoders) = prep.encode_and_save_encoder(&df)?;
//! # let _ = (df, bins, encoders);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Preparation steps
pub mod preprocessing;

pub use error::{PrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PrepError, Result};

    // Configuration
    pub use crate::preprocessing::{
        PreparationConfig, GridConfig, OutlierConfig, FillConfig, ListingSchema, ColumnSelector,
    };

    // Steps
    pub use crate::preprocessing::{
        categorize_location, fill_na_in_type, fill_na_per_city, handle_outliers_per_city,
        split_into_bins, split_and_save_bins, encode_city_column, encode_cat_columns,
        encode_and_save_encoder, ListingPreprocessor,
    };

    // Fitted parameters
    pub use crate::preprocessing::{BinEdges, DistanceBins, OneHotEncoder, DropPolicy, FittedEncoders};
}
