//! Shared listing fixtures for the integration tests

#![allow(dead_code)]

use listing_prep::prelude::*;
use polars::prelude::*;

pub const CITIES: [&str; 2] = ["krakow", "gdansk"];

/// Deterministic listings for two cities with scattered missing values
pub fn sample_listings(n: usize) -> DataFrame {
    let types = ["blockOfFlats", "apartmentBuilding", "tenement"];

    let mut city = Vec::with_capacity(n);
    let mut latitude = Vec::with_capacity(n);
    let mut longitude = Vec::with_capacity(n);
    let mut kind = Vec::with_capacity(n);
    let mut build_year = Vec::with_capacity(n);
    let mut condition = Vec::with_capacity(n);
    let mut floor_count = Vec::with_capacity(n);
    let mut floor = Vec::with_capacity(n);
    let mut square_meters = Vec::with_capacity(n);
    let mut poi_count = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);
    let mut has_elevator = Vec::with_capacity(n);
    let mut has_parking = Vec::with_capacity(n);
    let mut ownership = Vec::with_capacity(n);
    let mut school = Vec::with_capacity(n);
    let mut clinic = Vec::with_capacity(n);
    let mut centre = Vec::with_capacity(n);

    for i in 0..n {
        let krakow = i % 2 == 0;
        city.push(if krakow { CITIES[0] } else { CITIES[1] });
        if krakow {
            latitude.push(50.03 + (i % 7) as f64 * 0.01);
            longitude.push(19.90 + (i % 3) as f64 * 0.02);
        } else {
            latitude.push(54.33 + (i % 5) as f64 * 0.012);
            longitude.push(18.60 + (i % 4) as f64 * 0.015);
        }
        kind.push((i % 9 != 0).then(|| types[i % 3]));
        build_year.push((i % 11 != 0).then(|| (1890 + (i * 7) % 130) as f64));
        condition.push((i % 4 != 0).then(|| if i % 3 == 0 { "premium" } else { "low" }));
        floor_count.push((i % 13 != 0).then(|| (1 + i % 10) as f64));
        floor.push((i % 6 != 0).then(|| (i % 5) as f64));
        square_meters.push(25.0 + ((i * 37) % 100) as f64);
        poi_count.push(((i * 13) % 40) as f64);
        price.push(6_000.0 + ((i * 53) % 90) as f64 * 100.0);
        has_elevator.push((i % 10 != 0).then(|| if i % 3 == 0 { "yes" } else { "no" }));
        has_parking.push((i % 15 != 0).then(|| if i % 4 < 2 { "yes" } else { "no" }));
        ownership.push(if i % 5 == 0 { "cooperative" } else { "condominium" });
        school.push((i % 8 != 0).then(|| 0.05 + (i % 17) as f64 * 0.1));
        clinic.push(0.1 + (i % 23) as f64 * 0.08);
        centre.push((i % 12 != 0).then(|| 0.5 + ((i * 29) % 60) as f64 * 0.2));
    }

    df!(
        "city" => city,
        "latitude" => latitude,
        "longitude" => longitude,
        "type" => kind,
        "buildYear" => build_year,
        "condition" => condition,
        "floorCount" => floor_count,
        "floor" => floor,
        "squareMeters" => square_meters,
        "poiCount" => poi_count,
        "price_per_m2" => price,
        "hasElevator" => has_elevator,
        "hasParkingSpace" => has_parking,
        "ownership" => ownership,
        "schoolDistance" => school,
        "clinicDistance" => clinic,
        "centreDistance" => centre,
    )
    .unwrap()
}

/// Rows of one city
pub fn city_rows(df: &DataFrame, city: &str) -> DataFrame {
    let mask = df.column("city").unwrap().str().unwrap().equal(city);
    df.filter(&mask).unwrap()
}

/// Non-missing values of a numeric column as f64
pub fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|n| n.to_string()).collect()
}

/// Listings located, filled and clipped city by city, then concatenated
pub fn prepared_listings(n: usize) -> DataFrame {
    let prep = ListingPreprocessor::new();
    let located = prep.categorize_location(&sample_listings(n)).unwrap();

    let mut merged: Option<DataFrame> = None;
    for city in CITIES {
        let part = prep.fill_na_per_city(&city_rows(&located, city)).unwrap();
        let part = prep.handle_outliers_per_city(&part).unwrap();
        merged = Some(match merged {
            Some(df) => df.vstack(&part).unwrap(),
            None => part,
        });
    }
    merged.unwrap()
}

/// Linear-interpolated quantile of a numeric column, as computed by polars
pub fn quantile(df: &DataFrame, name: &str, q: f64) -> f64 {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .quantile(q, QuantileMethod::Linear)
        .unwrap()
        .unwrap()
}

/// Copy of `df` with the given text columns stored as categoricals
pub fn with_categoricals(df: &DataFrame, names: &[&str]) -> DataFrame {
    let mut result = df.clone();
    for name in names {
        let column = result
            .column(name)
            .unwrap()
            .cast(&DataType::Categorical(None, CategoricalOrdering::Physical))
            .unwrap();
        result.with_column(column).unwrap();
    }
    result
}
