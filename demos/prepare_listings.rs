//! Prepare a small synthetic listing table the way a training job would:
//! locate, fill and clip each city separately, then bin and encode the
//! merged table and replay the fitted parameters on held-out rows.
//!
//! Run with `RUST_LOG=listing_prep=debug` for per-column detail.

use listing_prep::prelude::*;
use polars::prelude::*;
use tracing::info;

const CITIES: [(&str, f64, f64); 2] = [("warszawa", 52.23, 21.01), ("poznan", 52.41, 16.93)];

fn synthetic_listings(rows_per_city: usize, offset: usize) -> Result<DataFrame> {
    let types = ["blockOfFlats", "apartmentBuilding", "tenement"];
    let mut frames = Vec::with_capacity(CITIES.len());

    for (city, lat, lon) in CITIES {
        let rows: Vec<usize> = (offset..offset + rows_per_city).collect();
        let frame = df!(
            "city" => vec![city; rows.len()],
            "latitude" => rows.iter().map(|i| lat + (i % 9) as f64 * 0.007).collect::<Vec<_>>(),
            "longitude" => rows.iter().map(|i| lon + (i % 5) as f64 * 0.011).collect::<Vec<_>>(),
            "type" => rows.iter().map(|i| (i % 7 != 0).then(|| types[i % 3])).collect::<Vec<_>>(),
            "buildYear" => rows
                .iter()
                .map(|i| (i % 10 != 0).then(|| (1900 + (i * 13) % 124) as f64))
                .collect::<Vec<_>>(),
            "condition" => rows
                .iter()
                .map(|i| (i % 3 != 0).then_some(if i % 2 == 0 { "premium" } else { "low" }))
                .collect::<Vec<_>>(),
            "floorCount" => rows
                .iter()
                .map(|i| (i % 8 != 0).then(|| (2 + i % 9) as f64))
                .collect::<Vec<_>>(),
            "floor" => rows
                .iter()
                .map(|i| (i % 5 != 0).then(|| (i % 6) as f64))
                .collect::<Vec<_>>(),
            "squareMeters" => rows.iter().map(|i| 28.0 + ((i * 31) % 90) as f64).collect::<Vec<_>>(),
            "poiCount" => rows.iter().map(|i| ((i * 7) % 60) as f64).collect::<Vec<_>>(),
            "price_per_m2" => rows
                .iter()
                .map(|i| 9_000.0 + ((i * 41) % 70) as f64 * 150.0)
                .collect::<Vec<_>>(),
            "hasBalcony" => rows
                .iter()
                .map(|i| (i % 6 != 0).then_some(if i % 4 == 0 { "no" } else { "yes" }))
                .collect::<Vec<_>>(),
            "pharmacyDistance" => rows
                .iter()
                .map(|i| (i % 9 != 0).then(|| 0.1 + (i % 13) as f64 * 0.09))
                .collect::<Vec<_>>(),
            "centreDistance" => rows
                .iter()
                .map(|i| (i % 11 != 0).then(|| 0.4 + ((i * 17) % 50) as f64 * 0.3))
                .collect::<Vec<_>>(),
        )?;
        frames.push(frame);
    }

    concat_frames(frames)
}

fn concat_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut frames = frames.into_iter();
    let mut merged = frames
        .next()
        .ok_or_else(|| PrepError::DataError("no frames to concatenate".to_string()))?;
    for frame in frames {
        merged.vstack_mut(&frame)?;
    }
    Ok(merged)
}

/// Locate, fill and clip each city on its own rows
fn prepare_per_city(prep: &ListingPreprocessor, df: &DataFrame) -> Result<DataFrame> {
    let located = prep.categorize_location(df)?;
    let city_column = &prep.config().schema.city;

    let mut frames = Vec::with_capacity(CITIES.len());
    for (city, _, _) in CITIES {
        let mask = located.column(city_column)?.str()?.equal(city);
        let rows = located.filter(&mask)?;
        let rows = prep.fill_na_per_city(&rows)?;
        frames.push(prep.handle_outliers_per_city(&rows)?);
    }
    concat_frames(frames)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_prep=info".into()),
        )
        .init();

    let prep = ListingPreprocessor::try_with_config(PreparationConfig::default())?;
    let schema = prep.config().schema.clone();

    let train = prepare_per_city(&prep, &synthetic_listings(60, 0)?)?;
    let (train, bins) = prep.split_and_save_bins(&train)?;
    let (train, encoders) = prep.encode_and_save_encoder(&train)?;
    info!(rows = train.height(), columns = train.width(), "Training table ready");
    println!("{}", train.head(Some(5)));

    println!("distance bins: {}", bins.to_json()?);
    println!("encoders: {}", encoders.to_json()?);

    let bins = DistanceBins::from_json(&bins.to_json()?)?;
    let encoders = FittedEncoders::from_json(&encoders.to_json()?)?;

    let holdout = prepare_per_city(&prep, &synthetic_listings(15, 60)?)?;
    let holdout = encoders.transform(&bins.apply(&holdout, &schema)?)?;
    info!(rows = holdout.height(), columns = holdout.width(), "Held-out table ready");
    println!("{}", holdout.head(Some(5)));

    Ok(())
}
