use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use epistate::simulation::{self, SUMMARY_REPORT, TIMESERIES_REPORT};
use epistate::{
    Context, ContextGlobalPropertiesExt, ContextRandomExt, ContextReportExt, ContextSummaryExt,
    DailyRecord, DiseaseState, EpiError, Parameters, ParametersValues, SummaryRecord,
    TransitionModel, TransitionModelProperty,
};
use tempfile::tempdir;

fn data_file(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn report_path(dir: &Path, short_name: &str) -> PathBuf {
    dir.join(format!("{short_name}.csv"))
}

fn read_timeseries(dir: &Path) -> Vec<DailyRecord> {
    let mut reader = csv::Reader::from_path(report_path(dir, TIMESERIES_REPORT)).unwrap();
    reader.deserialize().map(Result::unwrap).collect()
}

fn read_summary(dir: &Path) -> Vec<SummaryRecord> {
    let mut reader = csv::Reader::from_path(report_path(dir, SUMMARY_REPORT)).unwrap();
    reader.deserialize().map(Result::unwrap).collect()
}

fn run_default(output_dir: &Path, seed: u64) {
    simulation::run(
        data_file("countries.csv"),
        ["Sweden", "Chile"],
        100_000.0,
        "2021-04-01",
        "2021-05-15",
        seed,
        output_dir,
    )
    .unwrap();
}

#[test]
fn same_seed_gives_identical_output() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    run_default(first.path(), 42);
    run_default(second.path(), 42);
    for name in [TIMESERIES_REPORT, SUMMARY_REPORT] {
        assert_eq!(
            fs::read(report_path(first.path(), name)).unwrap(),
            fs::read(report_path(second.path(), name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[test]
fn different_seed_gives_different_trajectories() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    run_default(first.path(), 1);
    run_default(second.path(), 2);
    assert_ne!(
        fs::read(report_path(first.path(), TIMESERIES_REPORT)).unwrap(),
        fs::read(report_path(second.path(), TIMESERIES_REPORT)).unwrap()
    );
}

#[test]
fn timeseries_walks_are_consistent() {
    let dir = tempdir().unwrap();
    run_default(dir.path(), 7);
    let records = read_timeseries(dir.path());
    let days = 45;
    assert_eq!(records.len() % days, 0);

    for trajectory in records.chunks(days) {
        let first = &trajectory[0];
        assert_eq!(first.state, DiseaseState::H);
        assert_eq!(first.staying_days, 0);
        assert_eq!(first.prev_state, DiseaseState::H);
        for pair in trajectory.windows(2) {
            assert_eq!(pair[0].unique_id, pair[1].unique_id);
            assert_eq!(pair[1].prev_state, pair[0].state);
            assert_eq!(pair[1].date, pair[0].date.succ_opt().unwrap());
            if pair[1].state != pair[0].state {
                assert_eq!(pair[1].staying_days, 0);
            }
        }
    }

    let ids: Vec<usize> = records.chunks(days).map(|t| t[0].unique_id).collect();
    assert_eq!(ids, (0..ids.len()).collect::<Vec<_>>());
}

#[test]
fn summary_matches_timeseries() {
    let dir = tempdir().unwrap();
    run_default(dir.path(), 11);
    let records = read_timeseries(dir.path());
    let summary = read_summary(dir.path());
    assert_eq!(summary.len(), 45 * 2);

    let mut counts: HashMap<(String, String, DiseaseState), usize> = HashMap::new();
    let mut population: HashMap<String, usize> = HashMap::new();
    for record in &records {
        *counts
            .entry((record.date.to_string(), record.country.clone(), record.state))
            .or_default() += 1;
        if record.date.to_string() == "2021-04-01" {
            *population.entry(record.country.clone()).or_default() += 1;
        }
    }

    for (i, row) in summary.iter().enumerate() {
        let expected_country = if i % 2 == 0 { "Sweden" } else { "Chile" };
        assert_eq!(row.country, expected_country);
        assert_eq!(row.total(), population[&row.country]);
        for state in [
            DiseaseState::H,
            DiseaseState::I,
            DiseaseState::S,
            DiseaseState::M,
            DiseaseState::D,
        ] {
            let key = (row.date.to_string(), row.country.clone(), state);
            assert_eq!(row.count(state), counts.get(&key).copied().unwrap_or(0));
        }
    }
}

#[test]
fn missing_countries_file_aborts_without_output() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("results");
    let result = simulation::run(
        dir.path().join("countries.csv"),
        ["Sweden"],
        1000.0,
        "2021-04-01",
        "2021-04-30",
        0,
        &output_dir,
    );
    assert!(matches!(result, Err(EpiError::IoError(_))));
    assert!(!report_path(&output_dir, TIMESERIES_REPORT).exists());
    assert!(!report_path(&output_dir, SUMMARY_REPORT).exists());
}

#[test]
fn unknown_country_gives_zero_rows() {
    let dir = tempdir().unwrap();
    let outcome = simulation::run(
        data_file("countries.csv"),
        ["Atlantis", "Sweden"],
        1_000_000.0,
        "2021-04-01",
        "2021-04-03",
        0,
        dir.path(),
    )
    .unwrap();
    assert_eq!(outcome.simulated, 9);

    let summary = read_summary(dir.path());
    assert_eq!(summary.len(), 6);
    for row in summary.iter().filter(|row| row.country == "Atlantis") {
        assert_eq!(row.total(), 0);
    }
}

#[test]
fn configured_transition_model_is_used() {
    let dir = tempdir().unwrap();
    let model = TransitionModel::from_json_file(&data_file("transition_model.json")).unwrap();
    let parameters = ParametersValues::new(
        data_file("countries.csv"),
        ["Japan", "Kenya"],
        1_000_000.0,
        "2021-04-01",
        "2021-06-30",
    )
    .unwrap();

    let mut context = Context::new();
    context.set_global_property_value(Parameters, parameters).unwrap();
    context
        .set_global_property_value(TransitionModelProperty, model)
        .unwrap();
    context.report_options().directory(dir.path().to_path_buf());
    context.init_random(5);

    let outcome = simulation::init(&mut context).unwrap();
    context.execute();
    context.flush_reports().unwrap();
    assert!(context.take_summary_error().is_none());
    assert!(outcome.skipped.is_empty());

    // Daily infection chances of 10-20% over three months.
    let records = read_timeseries(dir.path());
    let ever_infected = records
        .iter()
        .filter(|r| r.state == DiseaseState::I && r.staying_days == 0)
        .count();
    assert!(ever_infected > 0);
    assert_eq!(read_summary(dir.path()).len(), 91 * 2);
}
