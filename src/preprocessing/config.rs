//! Preparation configuration

use serde::{Deserialize, Serialize};
use super::ListingSchema;
use crate::error::{PrepError, Result};

/// Constants for converting coordinates into grid cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Metres covered by one degree of latitude
    pub meters_per_degree: f64,

    /// Latitude (degrees) at which longitude spacing is approximated
    pub reference_latitude: f64,

    /// Side length of one grid cell in metres
    pub cell_size_meters: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            meters_per_degree: 111_111.0,
            reference_latitude: 50.0,
            cell_size_meters: 1_000.0,
        }
    }
}

impl GridConfig {
    /// Metres covered by one degree of longitude at the reference latitude
    pub fn meters_per_degree_longitude(&self) -> f64 {
        self.meters_per_degree * self.reference_latitude.to_radians().cos()
    }
}

/// Winsorization limits used by the outlier steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Build years at or below this value count towards the low clipping share
    pub build_year_cutoff: f64,

    /// Upper-tail share clipped from `squareMeters`
    pub square_meters_upper: f64,

    /// Upper-tail share clipped from `poiCount`
    pub poi_count_upper: f64,

    /// Upper-tail share clipped from `price_per_m2`
    pub price_per_m2_upper: f64,

    /// Upper-tail share clipped from `centreDistance` before binning
    pub centre_distance_upper: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            build_year_cutoff: 1919.0,
            square_meters_upper: 0.05,
            poi_count_upper: 0.10,
            price_per_m2_upper: 0.05,
            centre_distance_upper: 0.05,
        }
    }
}

/// Constant fill values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Value used for a missing `condition`
    pub default_condition: String,

    /// Value used for a missing `floor` when its `floorCount` group has no mode
    pub default_floor: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            default_condition: "standard".to_string(),
            default_floor: 1.0,
        }
    }
}

/// Configuration for listing preparation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationConfig {
    pub grid: GridConfig,
    pub outliers: OutlierConfig,
    pub fill: FillConfig,

    /// Number of equal-width bins for distance columns
    #[serde(default = "default_n_bins")]
    pub n_bins: usize,

    /// Column names and selectors
    pub schema: ListingSchema,
}

fn default_n_bins() -> usize {
    10
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            outliers: OutlierConfig::default(),
            fill: FillConfig::default(),
            n_bins: default_n_bins(),
            schema: ListingSchema::default(),
        }
    }
}

impl PreparationConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the grid cell size
    pub fn with_cell_size(mut self, meters: f64) -> Self {
        self.grid.cell_size_meters = meters;
        self
    }

    /// Builder method to set the number of bins
    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    /// Builder method to replace the outlier limits
    pub fn with_outliers(mut self, outliers: OutlierConfig) -> Self {
        self.outliers = outliers;
        self
    }

    /// Builder method to replace the column schema
    pub fn with_schema(mut self, schema: ListingSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Check that every constant is usable
    pub fn validate(&self) -> Result<()> {
        if self.n_bins == 0 {
            return Err(PrepError::invalid("n_bins", self.n_bins, "must be positive"));
        }
        if !(self.grid.cell_size_meters > 0.0) {
            return Err(PrepError::invalid(
                "grid.cell_size_meters",
                self.grid.cell_size_meters,
                "must be positive",
            ));
        }
        let limits = [
            ("outliers.square_meters_upper", self.outliers.square_meters_upper),
            ("outliers.poi_count_upper", self.outliers.poi_count_upper),
            ("outliers.price_per_m2_upper", self.outliers.price_per_m2_upper),
            ("outliers.centre_distance_upper", self.outliers.centre_distance_upper),
        ];
        for (name, limit) in limits {
            if !(0.0..=1.0).contains(&limit) {
                return Err(PrepError::invalid(name, limit, "must lie in [0, 1]"));
            }
        }
        Ok(())
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
