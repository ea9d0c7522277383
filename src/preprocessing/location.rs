//! Spatial bucketing of listing coordinates

use super::{numeric_values, GridConfig, ListingSchema};
use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Grid cell containing a coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub lat_index: i64,
    pub lon_index: i64,
}

impl GridCell {
    /// Cell for a coordinate pair, `None` when either coordinate is not finite
    pub fn locate(latitude: f64, longitude: f64, grid: &GridConfig) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        let lat_index = (latitude * grid.meters_per_degree / grid.cell_size_meters).floor();
        let lon_index =
            (longitude * grid.meters_per_degree_longitude() / grid.cell_size_meters).floor();
        Some(Self {
            lat_index: lat_index as i64,
            lon_index: lon_index as i64,
        })
    }
}

/// Replace `latitude`/`longitude` with a `locationCategory` code.
///
/// Codes are dense integers assigned to grid cells in order of first
/// appearance, starting at 1. Rows with a missing coordinate get a missing
/// code. The new column is appended; both coordinate columns are dropped.
pub fn categorize_location(
    df: &DataFrame,
    grid: &GridConfig,
    schema: &ListingSchema,
) -> Result<DataFrame> {
    let latitudes = numeric_values(df, &schema.latitude)?;
    let longitudes = numeric_values(df, &schema.longitude)?;

    let mut codes: HashMap<GridCell, i64> = HashMap::new();
    let categories: Vec<Option<i64>> = latitudes
        .iter()
        .zip(longitudes.iter())
        .map(|(lat, lon)| {
            let cell = GridCell::locate((*lat)?, (*lon)?, grid)?;
            let next = codes.len() as i64 + 1;
            Some(*codes.entry(cell).or_insert(next))
        })
        .collect();

    debug!(
        rows = df.height(),
        cells = codes.len(),
        "Assigned location categories"
    );

    let mut result = df.drop_many([schema.latitude.as_str(), schema.longitude.as_str()]);
    result.with_column(Series::new(schema.location_category.as_str().into(), categories))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_are_one_kilometre() {
        let grid = GridConfig::default();
        let a = GridCell::locate(50.0600, 19.9400, &grid).unwrap();
        let b = GridCell::locate(50.0601, 19.9401, &grid).unwrap();
        let c = GridCell::locate(50.0800, 19.9400, &grid).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_floor_division_for_negative_coordinates() {
        let grid = GridConfig::default();
        let cell = GridCell::locate(-0.0001, -0.0001, &grid).unwrap();
        assert_eq!(cell.lat_index, -1);
        assert_eq!(cell.lon_index, -1);
    }

    #[test]
    fn test_non_finite_coordinates() {
        let grid = GridConfig::default();
        assert!(GridCell::locate(f64::NAN, 19.9, &grid).is_none());
    }

    #[test]
    fn test_codes_follow_first_appearance() {
        let df = df!(
            "latitude" => &[52.2300, 50.0600, 52.2301, 54.3500],
            "longitude" => &[21.0100, 19.9400, 21.0101, 18.6500],
            "price" => &[1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        let result =
            categorize_location(&df, &GridConfig::default(), &ListingSchema::default()).unwrap();
        let codes: Vec<Option<i64>> =
            result.column("locationCategory").unwrap().i64().unwrap().into_iter().collect();

        assert_eq!(codes, vec![Some(1), Some(2), Some(1), Some(3)]);
        let names: Vec<&str> = result.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["price", "locationCategory"]);
    }

    #[test]
    fn test_missing_coordinate_leaves_missing_code() {
        let df = df!(
            "latitude" => &[Some(52.23), None, Some(50.06)],
            "longitude" => &[Some(21.01), Some(19.94), Some(19.94)],
        )
        .unwrap();

        let result =
            categorize_location(&df, &GridConfig::default(), &ListingSchema::default()).unwrap();
        let codes: Vec<Option<i64>> =
            result.column("locationCategory").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(1), None, Some(2)]);
    }
}
