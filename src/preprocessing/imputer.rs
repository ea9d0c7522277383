//! Missing value imputation with grouped statistics
//!
//! `type` is filled through a prioritized chain of grouped modes, the other
//! listing columns through per-column rules (grouped median, constant,
//! overall median, grouped mode, column mode, column mean).

use super::stats::{self, OrderedBits};
use super::{
    float_chunked, numeric_values, put_numeric, put_text, require_column, text_values, ColumnType,
    FillConfig, ListingSchema,
};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

type GroupKey = Vec<OrderedBits>;

/// Modes of the target column within one grouping
#[derive(Debug, Clone)]
struct ModeTier {
    keys: Vec<String>,
    modes: HashMap<GroupKey, String>,
}

/// Prioritized lookup of a text column's mode over progressively broader
/// groupings, ending at the global mode.
///
/// A row resolves through the first tier whose group (identified by the
/// row's own key values) has an observed mode. Rows with a missing key value
/// skip that tier.
#[derive(Debug, Clone)]
pub struct ModeLookupChain {
    target: String,
    tiers: Vec<ModeTier>,
    global: String,
}

impl ModeLookupChain {
    /// Fit the chain; `groupings` are listed from narrowest to broadest
    pub fn fit(df: &DataFrame, target: &str, groupings: &[&[&str]]) -> Result<Self> {
        let values = text_values(df, target)?;
        let global = stats::mode(values.iter().flatten().cloned())
            .ok_or_else(|| PrepError::EmptyColumn(target.to_string()))?;

        let mut tiers = Vec::with_capacity(groupings.len());
        for keys in groupings {
            let row_keys = group_keys(df, keys)?;
            let mut members: HashMap<GroupKey, Vec<String>> = HashMap::new();
            for (key, value) in row_keys.into_iter().zip(values.iter()) {
                if let (Some(key), Some(value)) = (key, value) {
                    members.entry(key).or_default().push(value.clone());
                }
            }
            let modes = members
                .into_iter()
                .filter_map(|(key, group)| stats::mode(group).map(|m| (key, m)))
                .collect();
            tiers.push(ModeTier {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                modes,
            });
        }

        Ok(Self {
            target: target.to_string(),
            tiers,
            global,
        })
    }

    /// Global mode, the last resort of the chain
    pub fn global(&self) -> &str {
        &self.global
    }

    /// Resolve a value for every row of `df`
    pub fn resolve(&self, df: &DataFrame) -> Result<Vec<String>> {
        let tier_keys = self
            .tiers
            .iter()
            .map(|tier| {
                let keys: Vec<&str> = tier.keys.iter().map(|k| k.as_str()).collect();
                group_keys(df, &keys)
            })
            .collect::<Result<Vec<_>>>()?;

        let resolved = (0..df.height())
            .map(|row| {
                self.tiers
                    .iter()
                    .zip(tier_keys.iter())
                    .find_map(|(tier, keys)| {
                        keys[row].as_ref().and_then(|k| tier.modes.get(k))
                    })
                    .unwrap_or(&self.global)
                    .clone()
            })
            .collect();

        Ok(resolved)
    }

    /// Fill missing target values with the resolved mode
    pub fn fill(&self, df: &DataFrame) -> Result<DataFrame> {
        let values = text_values(df, &self.target)?;
        let resolved = self.resolve(df)?;

        let mut filled = 0usize;
        let values: Vec<Option<String>> = values
            .into_iter()
            .zip(resolved)
            .map(|(v, r)| {
                if v.is_none() {
                    filled += 1;
                }
                Some(v.unwrap_or(r))
            })
            .collect();

        debug!(column = %self.target, filled, "Filled missing values from mode chain");

        let mut result = df.clone();
        let dtype = require_column(df, &self.target)?.dtype().clone();
        put_text(&mut result, &self.target, values, &dtype)?;
        Ok(result)
    }
}

/// Per-row group key; `None` when any key value is missing
fn group_keys(df: &DataFrame, keys: &[&str]) -> Result<Vec<Option<GroupKey>>> {
    let columns = keys
        .iter()
        .map(|k| numeric_values(df, k))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|col| col[row].map(OrderedBits::from))
                .collect::<Option<GroupKey>>()
        })
        .collect())
}

/// Fill missing `type` from the mode within (`buildYear`, `locationCategory`),
/// then within `locationCategory`, then the global mode.
pub fn fill_na_in_type(df: &DataFrame, schema: &ListingSchema) -> Result<DataFrame> {
    let by_year_and_location = [schema.build_year.as_str(), schema.location_category.as_str()];
    let by_location = [schema.location_category.as_str()];

    let chain = ModeLookupChain::fit(
        df,
        &schema.property_type,
        &[&by_year_and_location, &by_location],
    )?;
    chain.fill(df)
}

/// Fill the remaining listing columns of a single-city table.
///
/// Order matters: `type` is filled first because `buildYear` medians are
/// grouped by it, and `floorCount` before `floor` for the same reason.
pub fn fill_na_per_city(
    df: &DataFrame,
    fill: &FillConfig,
    schema: &ListingSchema,
) -> Result<DataFrame> {
    let mut result = fill_na_in_type(df, schema)?;

    fill_grouped_median(&mut result, &schema.build_year, &schema.property_type)?;
    fill_constant_text(&mut result, &schema.condition, &fill.default_condition)?;
    fill_overall_median(&mut result, &schema.floor_count)?;
    fill_grouped_mode(&mut result, &schema.floor, &schema.floor_count, fill.default_floor)?;

    for col in schema.feature_columns(&result) {
        fill_with_mode(&mut result, &col)?;
    }

    for col in schema.distance_columns(&result) {
        fill_with_mean(&mut result, &col)?;
    }

    Ok(result)
}

/// Rounded median of `target` within each `group_by` text group
fn fill_grouped_median(df: &mut DataFrame, target: &str, group_by: &str) -> Result<()> {
    let dtype = require_column(df, target)?.dtype().clone();
    let values = numeric_values(df, target)?;
    let groups = text_values(df, group_by)?;

    let mut members: HashMap<Option<String>, Vec<Option<f64>>> = HashMap::new();
    for (group, value) in groups.iter().zip(values.iter()) {
        members.entry(group.clone()).or_default().push(*value);
    }
    let medians: HashMap<Option<String>, Option<f64>> = members
        .into_iter()
        .map(|(g, vals)| (g, float_chunked(&vals).median().map(stats::round_half_even)))
        .collect();

    let filled = values
        .into_iter()
        .zip(groups.iter())
        .map(|(value, group)| match value {
            Some(v) => Ok(Some(v)),
            None => medians
                .get(group)
                .copied()
                .flatten()
                .map(Some)
                .ok_or_else(|| {
                    PrepError::EmptyColumn(format!(
                        "{} within {} group {:?}",
                        target, group_by, group
                    ))
                }),
        })
        .collect::<Result<Vec<_>>>()?;

    put_numeric(df, target, filled, &dtype)
}

fn fill_constant_text(df: &mut DataFrame, target: &str, constant: &str) -> Result<()> {
    let dtype = require_column(df, target)?.dtype().clone();
    let values = text_values(df, target)?;
    let filled = values
        .into_iter()
        .map(|v| Some(v.unwrap_or_else(|| constant.to_string())))
        .collect();
    put_text(df, target, filled, &dtype)
}

/// Rounded median of the whole column
fn fill_overall_median(df: &mut DataFrame, target: &str) -> Result<()> {
    let dtype = require_column(df, target)?.dtype().clone();
    let values = numeric_values(df, target)?;
    if values.iter().all(Option::is_some) {
        return Ok(());
    }

    let median = float_chunked(&values)
        .median()
        .map(stats::round_half_even)
        .ok_or_else(|| PrepError::EmptyColumn(target.to_string()))?;

    let filled = values.into_iter().map(|v| Some(v.unwrap_or(median))).collect();
    put_numeric(df, target, filled, &dtype)
}

/// Mode of `target` within each numeric `group_by` group, `default` when the
/// group has no observed value
fn fill_grouped_mode(df: &mut DataFrame, target: &str, group_by: &str, default: f64) -> Result<()> {
    let dtype = require_column(df, target)?.dtype().clone();
    let values = numeric_values(df, target)?;
    let groups: Vec<Option<OrderedBits>> = numeric_values(df, group_by)?
        .into_iter()
        .map(|g| g.map(OrderedBits::from))
        .collect();

    let mut members: HashMap<Option<OrderedBits>, Vec<f64>> = HashMap::new();
    for (group, value) in groups.iter().zip(values.iter()) {
        if let Some(v) = value {
            members.entry(*group).or_default().push(*v);
        }
    }
    let modes: HashMap<Option<OrderedBits>, f64> = members
        .into_iter()
        .filter_map(|(g, vals)| stats::mode_f64(vals).map(|m| (g, m)))
        .collect();

    let filled = values
        .into_iter()
        .zip(groups.iter())
        .map(|(value, group)| Some(value.unwrap_or_else(|| *modes.get(group).unwrap_or(&default))))
        .collect();

    put_numeric(df, target, filled, &dtype)
}

/// Column's own mode, whatever its type
fn fill_with_mode(df: &mut DataFrame, target: &str) -> Result<()> {
    let series = require_column(df, target)?;
    if series.null_count() == 0 {
        return Ok(());
    }
    let dtype = series.dtype().clone();
    let empty = || PrepError::EmptyColumn(target.to_string());

    match ColumnType::of(&dtype) {
        ColumnType::Categorical => {
            let values = text_values(df, target)?;
            let mode = stats::mode(values.iter().flatten().cloned()).ok_or_else(empty)?;
            let filled = values
                .into_iter()
                .map(|v| Some(v.unwrap_or_else(|| mode.clone())))
                .collect();
            put_text(df, target, filled, &dtype)
        }
        ColumnType::Boolean => {
            let values: Vec<Option<bool>> = series.bool()?.into_iter().collect();
            let mode = stats::mode(values.iter().flatten().copied()).ok_or_else(empty)?;
            let filled: Vec<Option<bool>> =
                values.into_iter().map(|v| Some(v.unwrap_or(mode))).collect();
            df.with_column(Series::new(target.into(), filled))?;
            Ok(())
        }
        ColumnType::Numeric => {
            let values = numeric_values(df, target)?;
            let mode = stats::mode_f64(values.iter().flatten().copied()).ok_or_else(empty)?;
            let filled = values.into_iter().map(|v| Some(v.unwrap_or(mode))).collect();
            put_numeric(df, target, filled, &dtype)
        }
        ColumnType::Unknown => Err(PrepError::DataError(format!(
            "cannot compute a mode for column '{}' of type {:?}",
            target, dtype
        ))),
    }
}

/// Column's own mean; an entirely missing column is left as is
fn fill_with_mean(df: &mut DataFrame, target: &str) -> Result<()> {
    let dtype = require_column(df, target)?.dtype().clone();
    let values = numeric_values(df, target)?;
    if values.iter().all(Option::is_some) {
        return Ok(());
    }

    match float_chunked(&values).mean() {
        Some(mean) => {
            let filled = values.into_iter().map(|v| Some(v.unwrap_or(mean))).collect();
            // Means are fractional; keep the filled column as floats
            let dtype = if dtype.is_float() { dtype } else { DataType::Float64 };
            put_numeric(df, target, filled, &dtype)
        }
        None => {
            warn!(column = %target, "No observed values, leaving column missing");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed_df() -> DataFrame {
        df!(
            "type" => &[Some("blockOfFlats"), Some("tenement"), None, Some("tenement"), None, None],
            "buildYear" => &[Some(1970.0), Some(1900.0), Some(1900.0), Some(1970.0), Some(2020.0), None],
            "locationCategory" => &[Some(1i64), Some(1), Some(1), Some(2), Some(2), Some(3)],
        )
        .unwrap()
    }

    #[test]
    fn test_chain_prefers_narrowest_group() {
        let df = typed_df();
        let result = fill_na_in_type(&df, &ListingSchema::default()).unwrap();
        let types = text_values(&result, "type").unwrap();

        // (1900, 1) -> tenement
        assert_eq!(types[2].as_deref(), Some("tenement"));
        // (2020, 2) has no observed type, location 2 -> tenement
        assert_eq!(types[4].as_deref(), Some("tenement"));
        // location 3 has nothing observed -> global mode
        assert_eq!(types[5].as_deref(), Some("tenement"));
        assert!(types.iter().all(Option::is_some));
    }

    #[test]
    fn test_chain_keeps_observed_values() {
        let df = typed_df();
        let result = fill_na_in_type(&df, &ListingSchema::default()).unwrap();
        let types = text_values(&result, "type").unwrap();
        assert_eq!(types[0].as_deref(), Some("blockOfFlats"));
        assert_eq!(result.column("type").unwrap().dtype(), &DataType::String);
    }

    fn as_categorical(df: &mut DataFrame, name: &str) {
        let column = df
            .column(name)
            .unwrap()
            .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
            .unwrap();
        df.with_column(column).unwrap();
    }

    #[test]
    fn test_categorical_type_keeps_its_dtype() {
        let mut df = typed_df();
        as_categorical(&mut df, "type");

        let result = fill_na_in_type(&df, &ListingSchema::default()).unwrap();
        let kind = result.column("type").unwrap();
        assert!(matches!(kind.dtype(), DataType::Categorical(_, _)));
        assert_eq!(kind.null_count(), 0);

        let types = text_values(&result, "type").unwrap();
        assert_eq!(types[0].as_deref(), Some("blockOfFlats"));
        assert_eq!(types[2].as_deref(), Some("tenement"));
    }

    #[test]
    fn test_fill_na_per_city_with_categorical_columns() {
        let mut df = city_df();
        as_categorical(&mut df, "type");
        as_categorical(&mut df, "condition");
        as_categorical(&mut df, "hasElevator");

        let result =
            fill_na_per_city(&df, &FillConfig::default(), &ListingSchema::default()).unwrap();
        for name in ["type", "condition", "hasElevator"] {
            let column = result.column(name).unwrap();
            assert!(matches!(column.dtype(), DataType::Categorical(_, _)), "{}", name);
            assert_eq!(column.null_count(), 0, "{}", name);
        }
        let conditions = text_values(&result, "condition").unwrap();
        assert_eq!(conditions[1].as_deref(), Some("standard"));
    }

    #[test]
    fn test_chain_requires_an_observed_value() {
        let df = df!(
            "type" => &[None::<&str>, None],
            "buildYear" => &[1990.0, 1991.0],
            "locationCategory" => &[1i64, 1],
        )
        .unwrap();
        assert!(matches!(
            fill_na_in_type(&df, &ListingSchema::default()),
            Err(PrepError::EmptyColumn(_))
        ));
    }

    #[test]
    fn test_missing_key_skips_tier() {
        let df = df!(
            "type" => &[Some("apartmentBuilding"), Some("blockOfFlats"), Some("blockOfFlats"), None],
            "buildYear" => &[Some(2000.0), Some(1980.0), Some(1980.0), None],
            "locationCategory" => &[Some(1i64), Some(1), Some(2), Some(1)],
        )
        .unwrap();
        let chain = ModeLookupChain::fit(
            &df,
            "type",
            &[&["buildYear", "locationCategory"], &["locationCategory"]],
        )
        .unwrap();
        let resolved = chain.resolve(&df).unwrap();
        // location 1 holds one of each; tie resolves to the smallest value
        assert_eq!(resolved[3], "apartmentBuilding");
        assert_eq!(chain.global(), "blockOfFlats");
    }

    fn city_df() -> DataFrame {
        df!(
            "type" => &[Some("blockOfFlats"), Some("blockOfFlats"), Some("tenement"), Some("tenement"), Some("blockOfFlats")],
            "buildYear" => &[Some(1970i64), Some(1975), Some(1905), None, None],
            "locationCategory" => &[1i64, 1, 2, 2, 3],
            "condition" => &[Some("premium"), None, Some("low"), None, None],
            "floorCount" => &[Some(4.0), Some(10.0), None, Some(4.0), Some(3.0)],
            "floor" => &[Some(2.0), None, Some(1.0), None, None],
            "hasElevator" => &[Some("no"), Some("yes"), Some("yes"), None, Some("no")],
            "hasBalcony" => &[Some(true), None, Some(true), Some(false), Some(true)],
            "schoolDistance" => &[Some(0.5), None, Some(1.5), Some(1.0), None],
            "centreDistance" => &[Some(3.0), Some(5.0), None, Some(7.0), Some(1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_fill_na_per_city_leaves_nothing_missing() {
        let result =
            fill_na_per_city(&city_df(), &FillConfig::default(), &ListingSchema::default())
                .unwrap();
        for name in [
            "type", "buildYear", "condition", "floorCount", "floor",
            "hasElevator", "hasBalcony", "schoolDistance", "centreDistance",
        ] {
            assert_eq!(result.column(name).unwrap().null_count(), 0, "{}", name);
        }
    }

    #[test]
    fn test_fill_na_per_city_rules() {
        let result =
            fill_na_per_city(&city_df(), &FillConfig::default(), &ListingSchema::default())
                .unwrap();

        // buildYear: rounded median within type, integer dtype kept
        let years = numeric_values(&result, "buildYear").unwrap();
        assert_eq!(years[3], Some(1905.0));
        assert_eq!(years[4], Some(1972.0)); // median 1972.5 rounds half to even
        assert_eq!(result.column("buildYear").unwrap().dtype(), &DataType::Int64);

        // condition: constant
        let conditions = text_values(&result, "condition").unwrap();
        assert_eq!(conditions[1].as_deref(), Some("standard"));
        assert_eq!(conditions[0].as_deref(), Some("premium"));

        // floorCount: rounded overall median of [4, 10, 4, 3] = 4
        let floor_counts = numeric_values(&result, "floorCount").unwrap();
        assert_eq!(floor_counts[2], Some(4.0));

        // floor: mode within floorCount, default 1 when the group has none
        let floors = numeric_values(&result, "floor").unwrap();
        assert_eq!(floors[1], Some(1.0)); // floorCount 10 has no observed floor
        assert_eq!(floors[3], Some(1.0)); // floorCount 4 holds floors [2, 1] -> tie -> 1
        assert_eq!(floors[4], Some(1.0)); // floorCount 3 has none

        // amenity columns: own mode
        let elevator = text_values(&result, "hasElevator").unwrap();
        assert_eq!(elevator[3].as_deref(), Some("no"));
        let balcony: Vec<Option<bool>> =
            result.column("hasBalcony").unwrap().bool().unwrap().into_iter().collect();
        assert_eq!(balcony[1], Some(true));

        // distance columns: own mean
        let school = numeric_values(&result, "schoolDistance").unwrap();
        assert_eq!(school[1], Some(1.0));
        let centre = numeric_values(&result, "centreDistance").unwrap();
        assert_eq!(centre[2], Some(4.0));
    }

    #[test]
    fn test_grouped_median_requires_observed_year() {
        let df = df!(
            "type" => &["tenement", "tenement"],
            "buildYear" => &[None::<f64>, None],
            "locationCategory" => &[1i64, 1],
            "condition" => &["low", "low"],
            "floorCount" => &[3.0, 3.0],
            "floor" => &[1.0, 2.0],
        )
        .unwrap();
        assert!(matches!(
            fill_na_per_city(&df, &FillConfig::default(), &ListingSchema::default()),
            Err(PrepError::EmptyColumn(_))
        ));
    }

    #[test]
    fn test_entirely_missing_distance_is_left_alone() {
        let mut df = df!("pharmacyDistance" => &[None::<f64>, None]).unwrap();
        fill_with_mean(&mut df, "pharmacyDistance").unwrap();
        assert_eq!(df.column("pharmacyDistance").unwrap().null_count(), 2);
    }
}
