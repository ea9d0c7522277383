//! Column names and column discovery for listing tables

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Rule for picking a family of columns out of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSelector {
    /// Every column whose name contains the marker
    Contains(String),
    /// An explicit list; names absent from the table are skipped
    Named(Vec<String>),
}

impl ColumnSelector {
    /// Column names of `df` matched by this selector, in table order
    pub fn select(&self, df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .filter(|name| self.matches(name.as_str()))
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether a single name is matched
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ColumnSelector::Contains(marker) => name.contains(marker.as_str()),
            ColumnSelector::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Column layout of an apartment listing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSchema {
    pub latitude: String,
    pub longitude: String,
    pub location_category: String,
    pub property_type: String,
    pub build_year: String,
    pub condition: String,
    pub floor_count: String,
    pub floor: String,
    pub city: String,
    pub square_meters: String,
    pub poi_count: String,
    pub price_per_m2: String,
    pub centre_distance: String,

    /// Boolean amenity columns (`hasElevator`, `hasBalcony`, ...)
    pub feature_columns: ColumnSelector,

    /// Distance-to-POI columns, `centre_distance` included
    pub distance_columns: ColumnSelector,
}

impl Default for ListingSchema {
    fn default() -> Self {
        Self {
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            location_category: "locationCategory".to_string(),
            property_type: "type".to_string(),
            build_year: "buildYear".to_string(),
            condition: "condition".to_string(),
            floor_count: "floorCount".to_string(),
            floor: "floor".to_string(),
            city: "city".to_string(),
            square_meters: "squareMeters".to_string(),
            poi_count: "poiCount".to_string(),
            price_per_m2: "price_per_m2".to_string(),
            centre_distance: "centreDistance".to_string(),
            feature_columns: ColumnSelector::Contains("has".to_string()),
            distance_columns: ColumnSelector::Contains("Distance".to_string()),
        }
    }
}

impl ListingSchema {
    /// Name of the log-price column added by the outlier step
    pub fn price_per_m2_log(&self) -> String {
        format!("{}_log", self.price_per_m2)
    }

    /// Amenity columns present in `df`
    pub fn feature_columns(&self, df: &DataFrame) -> Vec<String> {
        self.feature_columns.select(df)
    }

    /// Distance columns present in `df`
    pub fn distance_columns(&self, df: &DataFrame) -> Vec<String> {
        self.distance_columns.select(df)
    }
}
