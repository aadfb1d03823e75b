use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use excess_mortality::models::HouseholdRecord;
use excess_mortality::reader::{read_table, write_parquet};
use excess_mortality::{MortalityError, SurveyDataset, TableRecord};

use crate::utils::write_small_dataset;

#[test]
fn test_dataset_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let written = write_small_dataset(dir.path(), 11).unwrap();

    let loaded = SurveyDataset::load(dir.path(), false).unwrap();

    assert_eq!(loaded.households, written.households);
    assert_eq!(loaded.weights, written.weights);
    assert_eq!(loaded.individuals, written.individuals);
    assert_eq!(loaded.deaths, written.deaths);
    assert_eq!(loaded.official_deaths, written.official_deaths);
    assert_eq!(loaded.population, written.population);
    assert_eq!(loaded.census_household_size, written.census_household_size);
    assert_eq!(loaded.census_age, written.census_age);
}

#[test]
fn test_table_directory_is_read_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let table_dir = dir.path().join(HouseholdRecord::TABLE_NAME);
    std::fs::create_dir_all(&table_dir).unwrap();

    let household = |id: &str, strata: i32| HouseholdRecord {
        hh_id: id.to_string(),
        strata,
        cluster: "c1".to_string(),
        size: Some(2),
    };
    let first = vec![household("a", 1), household("b", 1)];
    let second = vec![household("c", 2)];
    write_parquet(&table_dir.join("part-0.parquet"), &HouseholdRecord::to_batch(&first).unwrap())
        .unwrap();
    write_parquet(&table_dir.join("part-1.parquet"), &HouseholdRecord::to_batch(&second).unwrap())
        .unwrap();

    let rows = read_table::<HouseholdRecord>(dir.path()).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.hh_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_foreign_column_types_are_adapted() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(Schema::new(vec![
        Field::new("hh_id", DataType::Utf8, false),
        Field::new("strata", DataType::Int64, false),
        Field::new("cluster", DataType::Utf8, false),
        Field::new("interviewer", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["h1", "h2"])),
            Arc::new(Int64Array::from(vec![3, 4])),
            Arc::new(StringArray::from(vec!["3-01", "4-02"])),
            Arc::new(StringArray::from(vec![Some("x"), None])),
        ],
    )
    .unwrap();
    write_parquet(&dir.path().join("households.parquet"), &batch).unwrap();

    let rows = read_table::<HouseholdRecord>(dir.path()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].strata, 4);
    assert_eq!(rows[0].cluster, "3-01");
    // size column absent: nullable, so filled with nulls
    assert!(rows.iter().all(|r| r.size.is_none()));
}

#[test]
fn test_missing_table() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_table::<HouseholdRecord>(dir.path()).unwrap_err();
    assert!(matches!(err, MortalityError::MissingTable { .. }));
}

#[test]
fn test_missing_required_column() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(Schema::new(vec![Field::new("hh_id", DataType::Utf8, false)]));
    let batch =
        RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["h1"]))]).unwrap();
    write_parquet(&dir.path().join("households.parquet"), &batch).unwrap();

    let err = read_table::<HouseholdRecord>(dir.path()).unwrap_err();
    assert!(matches!(err, MortalityError::MissingColumn { .. }));
}

#[test]
fn test_missing_directory() {
    let err = SurveyDataset::load(std::path::Path::new("/nonexistent/mortality"), false).unwrap_err();
    assert!(matches!(err, MortalityError::IoError(_)));
}
