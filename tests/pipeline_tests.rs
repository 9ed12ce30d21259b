//! Integration tests for the data-preparation pipeline.
//!
//! These exercise the stages end-to-end on synthetic listings: geo-join,
//! normalizer, and outlier filter, plus the chained flow.

use immo_prep::cleaner::DataCleaner;
use immo_prep::geojoin::{GeoJoiner, RegionSet};
use immo_prep::outliers::OutlierFilter;
use immo_prep::{PrepConfig, PrepError, UnmappedCategory};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

// ============================================================================
// Helper Functions
// ============================================================================

/// A valid listings table with `n` rows; tests overwrite the columns under
/// scrutiny via `DataFrame::replace`.
fn listings(n: usize) -> DataFrame {
    let ids: Vec<i64> = (1..=n as i64).collect();
    df![
        "ID" => ids,
        "Price" => vec![Some(250_000.0); n],
        "LivingArea" => vec![Some(150.0); n],
        "TerraceArea" => vec![None::<f64>; n],
        "GardenArea" => vec![None::<f64>; n],
        "EnergyConsumptionPerSqm" => vec![Some(120.0); n],
        "PostalCode" => vec![Some("1000"); n],
        "ConstructionYear" => vec![Some(1995i64); n],
        "BedroomCount" => vec![Some(3i64); n],
        "Furnished" => vec![None::<i64>; n],
        "Fireplace" => vec![None::<i64>; n],
        "Terrace" => vec![None::<i64>; n],
        "Garden" => vec![None::<i64>; n],
        "Facades" => vec![Some(2i64); n],
        "SwimmingPool" => vec![None::<i64>; n],
        "bookmarkCount" => vec![None::<i64>; n],
        "ViewCount" => vec![None::<i64>; n],
        "BidStylePricing" => vec![None::<i64>; n],
        "City" => vec![Some("BRUSSELS"); n],
        "Region" => vec![Some("BRUSSELS"); n],
        "District" => vec![Some("BRUSSELS"); n],
        "Province" => vec![Some("BRABANT"); n],
        "PropertyType" => vec![Some("HOUSE"); n],
        "PropertySubType" => vec![Some("HOUSE"); n],
        "KitchenType" => vec![Some("INSTALLED"); n],
        "Condition" => vec![Some("GOOD"); n],
        "EPCScore" => vec![Some("B_label"); n],
        "SaleType" => vec!["residential_sale"; n],
        "ListingCreateDate" => vec![Some("15/01/2024"); n],
        "ListingExpirationDate" => vec![Some("2024-06-15"); n],
        "ListingCloseDate" => vec![None::<&str>; n],
        "Latitude" => vec![Some(50.85); n],
        "Longitude" => vec![Some(4.35); n],
        "Refnis" => vec![Some(21004i64); n],
    ]
    .unwrap()
}

fn test_config() -> PrepConfig {
    PrepConfig::builder()
        .save_outputs(false)
        .reference_year(2024)
        .build()
        .unwrap()
}

fn clean(df: DataFrame) -> DataFrame {
    DataCleaner.clean(df, &test_config()).unwrap()
}

fn replace(df: &mut DataFrame, name: &str, series: Series) {
    df.replace(name, series).unwrap();
}

fn i64_at(df: &DataFrame, column: &str, row: usize) -> Option<i64> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .get(row)
}

fn f64_at(df: &DataFrame, column: &str, row: usize) -> Option<f64> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .get(row)
}

fn str_at(df: &DataFrame, column: &str, row: usize) -> Option<String> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .get(row)
        .map(str::to_string)
}

fn brussels_joiner() -> GeoJoiner {
    let boundaries = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature",
         "properties":{"cd_munty_refnis":21004,"tx_munty_descr_nl":"Brussel"},
         "geometry":{"type":"Polygon","coordinates":[[[4.0,50.5],[5.0,50.5],[5.0,51.5],[4.0,51.5],[4.0,50.5]]]}}]}"#;
    let regions = RegionSet::from_geojson_str(boundaries).unwrap();
    let mut density = HashMap::new();
    density.insert(21004i64, 7514.2);
    GeoJoiner::from_parts(regions, density)
}

// ============================================================================
// Normalizer Tests
// ============================================================================

#[test]
fn test_rows_without_price_or_living_area_are_dropped() {
    let mut df = listings(4);
    replace(
        &mut df,
        "Price",
        Series::new(
            "Price".into(),
            &[Some(250_000.0), None, Some(300_000.0), Some(200_000.0)],
        ),
    );
    replace(
        &mut df,
        "LivingArea",
        Series::new(
            "LivingArea".into(),
            &[Some(150.0), Some(120.0), Some(0.0), Some(100.0)],
        ),
    );

    let cleaned = clean(df);
    assert_eq!(cleaned.height(), 2);
    assert_eq!(i64_at(&cleaned, "ID", 0), Some(1));
    assert_eq!(i64_at(&cleaned, "ID", 1), Some(4));

    // Every surviving row carries both fields.
    assert_eq!(cleaned.column("Price").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("LivingArea").unwrap().null_count(), 0);
}

#[test]
fn test_sale_type_and_bid_pricing_filter() {
    let mut df = listings(3);
    replace(
        &mut df,
        "SaleType",
        Series::new(
            "SaleType".into(),
            &["residential_sale", "annuity_sale", "residential_sale"],
        ),
    );
    replace(
        &mut df,
        "BidStylePricing",
        Series::new("BidStylePricing".into(), &[None, Some(0i64), Some(1i64)]),
    );

    let cleaned = clean(df);
    assert_eq!(cleaned.height(), 1);
    assert_eq!(i64_at(&cleaned, "ID", 0), Some(1));
    assert_eq!(str_at(&cleaned, "SaleType", 0).as_deref(), Some("residential_sale"));
    assert_eq!(i64_at(&cleaned, "BidStylePricing", 0), Some(0));
}

#[test]
fn test_duplicate_ids_and_shadow_duplicates_are_dropped() {
    let mut df = listings(4);
    replace(&mut df, "ID", Series::new("ID".into(), &[1i64, 1, 2, 3]));
    replace(
        &mut df,
        "Price",
        Series::new(
            "Price".into(),
            &[Some(250_000.0), Some(250_000.0), Some(300_000.0), Some(300_000.0)],
        ),
    );

    // Row 2 shares an ID with row 1; row 4 equals row 3 in every column but ID.
    let cleaned = clean(df);
    assert_eq!(cleaned.height(), 2);
    assert_eq!(i64_at(&cleaned, "ID", 0), Some(1));
    assert_eq!(i64_at(&cleaned, "ID", 1), Some(2));

    let ids = cleaned.column("ID").unwrap().as_materialized_series().clone();
    assert_eq!(ids.n_unique().unwrap(), cleaned.height());
}

#[test]
fn test_zero_fill_and_derived_fields() {
    let mut df = listings(1);
    replace(
        &mut df,
        "GardenArea",
        Series::new("GardenArea".into(), &[Some(30.0)]),
    );
    replace(
        &mut df,
        "TerraceArea",
        Series::new("TerraceArea".into(), &[Some(20.0)]),
    );

    let cleaned = clean(df);
    assert_eq!(f64_at(&cleaned, "TotalArea", 0), Some(200.0));
    // 250000 / 150 = 1666.67 and 250000 / 200 = 1250.
    assert_eq!(i64_at(&cleaned, "PricePerLivingSquareMeter", 0), Some(1667));
    assert_eq!(i64_at(&cleaned, "PricePerTotalSquareMeter", 0), Some(1250));
}

#[test]
fn test_total_area_identity_holds_for_all_rows() {
    let mut df = listings(3);
    replace(
        &mut df,
        "GardenArea",
        Series::new("GardenArea".into(), &[Some(10.0), None, Some(55.5)]),
    );
    replace(
        &mut df,
        "TerraceArea",
        Series::new("TerraceArea".into(), &[None::<f64>, None, Some(12.5)]),
    );

    let cleaned = clean(df);
    for row in 0..cleaned.height() {
        let living = f64_at(&cleaned, "LivingArea", row).unwrap();
        let garden = f64_at(&cleaned, "GardenArea", row).unwrap();
        let terrace = f64_at(&cleaned, "TerraceArea", row).unwrap();
        let total = f64_at(&cleaned, "TotalArea", row).unwrap();
        assert!((total - (living + garden + terrace)).abs() < 1e-9);

        let price = f64_at(&cleaned, "Price", row).unwrap();
        let ratio = i64_at(&cleaned, "PricePerLivingSquareMeter", row).unwrap();
        assert_eq!(ratio, (price / living).round_ties_even() as i64);
    }
}

#[test]
fn test_construction_year_beyond_horizon_becomes_null() {
    let mut df = listings(3);
    replace(
        &mut df,
        "ConstructionYear",
        Series::new(
            "ConstructionYear".into(),
            &[Some(2074i64), Some(2030), Some(1890)],
        ),
    );

    // Reference year pinned to 2024, so anything past 2034 is implausible.
    let cleaned = clean(df);
    assert_eq!(i64_at(&cleaned, "ConstructionYear", 0), None);
    assert_eq!(i64_at(&cleaned, "ConstructionYear", 1), Some(2030));
    assert_eq!(i64_at(&cleaned, "ConstructionYear", 2), Some(1890));
}

#[test]
fn test_epc_score_truncated_at_underscore() {
    let mut df = listings(2);
    replace(
        &mut df,
        "EPCScore",
        Series::new("EPCScore".into(), &[Some("A_label"), Some("C")]),
    );

    let cleaned = clean(df);
    assert_eq!(str_at(&cleaned, "EPCScore", 0).as_deref(), Some("A"));
    assert_eq!(str_at(&cleaned, "EPCScore", 1).as_deref(), Some("C"));
}

#[test]
fn test_condition_and_kitchen_encodings() {
    let mut df = listings(3);
    replace(
        &mut df,
        "Condition",
        Series::new(
            "Condition".into(),
            &[Some("GOOD"), Some("UNKNOWN_VALUE"), None],
        ),
    );
    replace(
        &mut df,
        "KitchenType",
        Series::new(
            "KitchenType".into(),
            &[Some("HYPER_EQUIPPED"), Some("USA_UNINSTALLED"), Some("NOT_INSTALLED")],
        ),
    );

    let cleaned = clean(df);
    assert_eq!(i64_at(&cleaned, "Condition#", 0), Some(3));
    assert_eq!(i64_at(&cleaned, "Condition#", 1), None);
    assert_eq!(i64_at(&cleaned, "Condition#", 2), None);
    assert_eq!(i64_at(&cleaned, "KitchenType#", 0), Some(1));
    assert_eq!(i64_at(&cleaned, "KitchenType#", 1), Some(0));
    assert_eq!(i64_at(&cleaned, "KitchenType#", 2), Some(0));
}

#[test]
fn test_strict_category_policy_fails_on_unmapped() {
    let mut df = listings(1);
    replace(
        &mut df,
        "Condition",
        Series::new("Condition".into(), &[Some("BRAND_NEW")]),
    );

    let config = PrepConfig::builder()
        .save_outputs(false)
        .reference_year(2024)
        .unmapped_categories(UnmappedCategory::Fail)
        .build()
        .unwrap();
    let err = DataCleaner.clean(df, &config).unwrap_err();
    assert!(matches!(err, PrepError::UnmappedCategory { .. }));
}

#[test]
fn test_corrupted_e_repaired_and_text_formatted() {
    let mut df = listings(1);
    replace(
        &mut df,
        "City",
        Series::new("City".into(), &[Some("  LI\u{FFFD}GE ")]),
    );

    let cleaned = clean(df);
    assert_eq!(str_at(&cleaned, "City", 0).as_deref(), Some("Liege"));
}

#[test]
fn test_negative_energy_consumption_clamped() {
    let mut df = listings(2);
    replace(
        &mut df,
        "EnergyConsumptionPerSqm",
        Series::new(
            "EnergyConsumptionPerSqm".into(),
            &[Some(-45.0), Some(180.0)],
        ),
    );

    let cleaned = clean(df);
    assert_eq!(f64_at(&cleaned, "EnergyConsumptionPerSqm", 0), Some(0.0));
    assert_eq!(f64_at(&cleaned, "EnergyConsumptionPerSqm", 1), Some(180.0));
}

#[test]
fn test_coercion_failure_names_column_and_row() {
    let mut df = listings(2);
    replace(
        &mut df,
        "Price",
        Series::new("Price".into(), &[Some("250000"), Some("on request")]),
    );

    let err = DataCleaner.clean(df, &test_config()).unwrap_err();
    match err {
        PrepError::Coercion { column, row, .. } => {
            assert_eq!(column, "Price");
            assert_eq!(row, "2");
        }
        other => panic!("expected Coercion, got {other:?}"),
    }
}

#[test]
fn test_missing_expected_column_is_schema_mismatch() {
    let df = listings(2).drop("Condition").unwrap();
    let err = DataCleaner.clean(df, &test_config()).unwrap_err();
    assert!(matches!(err, PrepError::SchemaMismatch { .. }));
}

#[test]
fn test_normalizer_is_idempotent() {
    let mut df = listings(5);
    replace(
        &mut df,
        "GardenArea",
        Series::new(
            "GardenArea".into(),
            &[Some(30.0), None, Some(10.0), None, Some(5.0)],
        ),
    );
    replace(
        &mut df,
        "ConstructionYear",
        Series::new(
            "ConstructionYear".into(),
            &[Some(2074i64), Some(1960), Some(2001), None, Some(1988)],
        ),
    );

    let once = clean(df);
    let twice = clean(once.clone());
    assert!(once.equals_missing(&twice));
}

// ============================================================================
// Geo-Join Tests
// ============================================================================

#[test]
fn test_geojoin_enriches_without_changing_row_count() {
    let mut df = listings(3);
    // Second row outside the polygon, third with unusable coordinates.
    replace(
        &mut df,
        "Latitude",
        Series::new("Latitude".into(), &[Some(50.85), Some(40.0), None]),
    );

    let joined = brussels_joiner().join(df).unwrap();
    assert_eq!(joined.height(), 3);

    assert_eq!(i64_at(&joined, "cd_munty_refnis", 0), Some(21004));
    assert_eq!(str_at(&joined, "tx_munty_descr_nl", 0).as_deref(), Some("Brussel"));
    assert_eq!(i64_at(&joined, "Refnis", 0), Some(21004));
    assert_eq!(f64_at(&joined, "PopulationDensity", 0), Some(7514.2));

    for row in 1..3 {
        assert_eq!(i64_at(&joined, "cd_munty_refnis", row), Some(-1));
        assert_eq!(str_at(&joined, "tx_munty_descr_nl", row), None);
        assert_eq!(i64_at(&joined, "Refnis", row), None);
        assert_eq!(f64_at(&joined, "PopulationDensity", row), None);
    }
}

// ============================================================================
// Outlier Filter Tests
// ============================================================================

#[test]
fn test_group_iqr_scenario() {
    // Ratios [100, 102, 98, 101, 500] within one (Refnis, subtype) group:
    // 500 goes, the other four stay.
    let mut df = listings(5);
    replace(
        &mut df,
        "LivingArea",
        Series::new("LivingArea".into(), &[Some(100.0); 5]),
    );
    replace(
        &mut df,
        "Price",
        Series::new(
            "Price".into(),
            &[
                Some(10_000.0),
                Some(10_200.0),
                Some(9_800.0),
                Some(10_100.0),
                Some(50_000.0),
            ],
        ),
    );

    let cleaned = clean(df);
    assert_eq!(cleaned.height(), 5);

    let model = OutlierFilter::from_config(&test_config())
        .filter(cleaned)
        .unwrap();
    assert_eq!(model.height(), 4);
    for row in 0..model.height() {
        assert!(i64_at(&model, "PricePerLivingSquareMeter", row).unwrap() <= 102);
    }
}

#[test]
fn test_outlier_filter_preserves_column_set() {
    let cleaned = clean(listings(5));
    let columns_before: Vec<String> = cleaned
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let model = OutlierFilter::from_config(&test_config())
        .filter(cleaned)
        .unwrap();
    let columns_after: Vec<String> = model
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(columns_before, columns_after);
}

// ============================================================================
// Chained Stages
// ============================================================================

#[test]
fn test_join_clean_filter_chain() {
    let mut df = listings(6);
    // One outlier in the Brussels group, one row outside any municipality.
    replace(
        &mut df,
        "LivingArea",
        Series::new("LivingArea".into(), &[Some(100.0); 6]),
    );
    replace(
        &mut df,
        "Price",
        Series::new(
            "Price".into(),
            &[
                Some(10_000.0),
                Some(10_200.0),
                Some(9_800.0),
                Some(10_100.0),
                Some(50_000.0),
                Some(10_050.0),
            ],
        ),
    );
    replace(
        &mut df,
        "Latitude",
        Series::new(
            "Latitude".into(),
            &[Some(50.85), Some(50.86), Some(50.87), Some(50.88), Some(50.89), Some(40.0)],
        ),
    );

    let joined = brussels_joiner().join(df).unwrap();
    assert_eq!(joined.height(), 6);

    let cleaned = clean(joined);
    assert_eq!(cleaned.height(), 6);
    assert_eq!(cleaned.column("Price").unwrap().null_count(), 0);

    let model = OutlierFilter::from_config(&test_config())
        .filter(cleaned)
        .unwrap();
    // The 500-ratio row is the lone outlier within the Brussels partition;
    // the unmatched row sits alone in the null-key partition and survives.
    assert_eq!(model.height(), 5);
}
