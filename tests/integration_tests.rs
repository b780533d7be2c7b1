use std::collections::BTreeMap;

use transport_workload::analyzers::registry::{AnalysisOutput, AnalysisParams};
use transport_workload::config::EngineConfig;
use transport_workload::engine::Engine;
use transport_workload::error::EngineError;
use transport_workload::table::Cell;

const SEMICOLON: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/transports_semicolon.csv");
const COMMA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/transports_comma.csv");

fn engine(path: &str) -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine.load(path).expect("Failed to load fixture");
    engine
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

#[test]
fn test_full_pipeline() {
    let mut engine = engine(SEMICOLON);

    let summary = engine.data_summary().unwrap();
    assert_eq!(summary.column_count, 9);
    assert_eq!(summary.row_count, 6);
    assert_eq!(summary.filtered_count, Some(1));

    let report = engine.analyze_workload().unwrap();
    let hours: Vec<u32> = report.workload_stats.iter().map(|s| s.hour).collect();
    assert_eq!(hours, vec![9, 10, 11]);

    let nine = &report.workload_stats[0];
    assert_eq!(nine.num_transporters, 2);
    assert_eq!(nine.total_duration_minutes, 25.0);
    assert!((nine.workload_details["A"] - 60.0).abs() < 1e-9);
    assert!((nine.workload_details["B"] - 40.0).abs() < 1e-9);
    assert!((nine.range_percent - 20.0).abs() < 1e-9);
    assert_eq!(nine.date_hour, "2024-01-05 9:00");

    for stat in &report.workload_stats {
        let total: f64 = stat.workload_details.values().sum();
        assert!((total - 100.0).abs() < 1e-6);
        assert!((stat.expected_workload_percent * stat.num_transporters as f64 - 100.0).abs() < 1e-9);
        assert!((0.0..1.0).contains(&stat.gini));
    }

    let eleven = &report.workload_stats[2];
    assert_eq!(eleven.num_transporters, 1);
    assert_eq!(eleven.relative_inequality, 0.0);

    assert_eq!(report.hourly_stats.len(), 3);
    assert_eq!(report.hourly_stats[0].hour_formatted, "9:00");
}

#[test]
fn test_rankings_exclude_single_transporter_buckets() {
    let mut engine = engine(SEMICOLON);

    let highest: Vec<u32> = engine.highest_inequality(5).unwrap().iter().map(|s| s.hour).collect();
    let lowest: Vec<u32> = engine.lowest_inequality(5).unwrap().iter().map(|s| s.hour).collect();
    assert_eq!(highest, vec![10, 9]);
    assert_eq!(lowest, vec![9, 10]);
    assert_eq!(engine.highest_inequality(1).unwrap().len(), 1);
    assert_eq!(engine.median_inequality(5).unwrap().len(), 2);
}

#[test]
fn test_transporter_summary() {
    let engine = engine(SEMICOLON);
    let summary = engine.transporter_summary().unwrap();

    let ids: Vec<&str> = summary.iter().map(|s| s.transporter_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(summary[0].total_transports, 2);
    assert!((summary[0].total_minutes - 27.0).abs() < 1e-9);
    assert_eq!(summary[1].total_transports, 2);
    assert!((summary[1].avg_duration - 15.0).abs() < 1e-9);
    assert_eq!(summary[2].total_transports, 1);
    assert_eq!(summary[2].busiest_hour, Some(10));
}

#[test]
fn test_registry_analyses() {
    let engine = engine(SEMICOLON);
    let params = AnalysisParams::new();

    let AnalysisOutput::HourlyActivity(hourly) = engine.run_analysis("hourly_activity", &params).unwrap() else {
        panic!("wrong analysis output");
    };
    assert_eq!(hourly.hours.len(), 24);
    assert_eq!(hourly.counts[9], 2);
    assert_eq!(hourly.counts[11], 1);
    assert_eq!(hourly.max_duration_filter, 30.0);

    let AnalysisOutput::TransportTypes(types) = engine.run_analysis("transport_types", &params).unwrap() else {
        panic!("wrong analysis output");
    };
    assert_eq!(types.most_common, Some(text("Säng")));
    assert_eq!(types.counts[0], 5);
    assert!(!types.types.contains(&text("Rullstol")));

    let AnalysisOutput::LocationFrequency(locations) =
        engine.run_analysis("location_frequency", &params).unwrap()
    else {
        panic!("wrong analysis output");
    };
    assert_eq!(locations.start_locations.names[0], text("Akuten"));
    assert_eq!(locations.start_locations.counts[0], 4);
    assert_eq!(locations.routes.names[0], text("Akuten → Röntgen"));

    let AnalysisOutput::TransportDuration(durations) =
        engine.run_analysis("transport_duration", &params).unwrap()
    else {
        panic!("wrong analysis output");
    };
    assert_eq!(durations.count, 5);
    assert_eq!(durations.min, 5.0);
    assert_eq!(durations.max, 20.0);
    assert_eq!(durations.median, 12.0);
    assert_eq!(durations.histogram.bins.len(), durations.histogram.values.len());
    assert_eq!(durations.histogram.values.iter().sum::<usize>(), 5);

    let AnalysisOutput::PriorityAnalysis(priorities) =
        engine.run_analysis("priority_analysis", &params).unwrap()
    else {
        panic!("wrong analysis output");
    };
    assert_eq!(priorities.priorities[0], Cell::Int(1));
    assert_eq!(priorities.counts[0], 4);
}

#[test]
fn test_explicit_column_override() {
    let engine = engine(SEMICOLON);
    let params: AnalysisParams = [("type_column".to_string(), "Slutplats".to_string())]
        .into_iter()
        .collect();
    let AnalysisOutput::TransportTypes(types) = engine.run_analysis("transport_types", &params).unwrap() else {
        panic!("wrong analysis output");
    };
    assert_eq!(types.most_common, Some(text("Röntgen")));

    let params: AnalysisParams = [("type_column".to_string(), "Saknas".to_string())]
        .into_iter()
        .collect();
    let degraded = engine.run_analysis("transport_types", &params).unwrap();
    assert!(degraded.error().is_some());
}

#[test]
fn test_comma_file_and_degraded_analyses() {
    let mut engine = engine(COMMA);
    assert_eq!(engine.columns().unwrap().len(), 3);
    assert_eq!(engine.filtered_count().unwrap(), 1);

    let report = engine.analyze_workload().unwrap();
    assert_eq!(report.workload_stats.len(), 1);
    let stat = &report.workload_stats[0];
    assert_eq!(stat.relative_inequality, 0.0);
    assert_eq!(stat.gini, 0.0);
    assert!(stat.workload_details.contains_key("101"));

    let results = engine.run_all_analyses().unwrap();
    assert!(results["transport_types"].error().is_some());
    assert!(results["priority_analysis"].error().is_some());
    assert!(results["hourly_activity"].error().is_none());
}

#[test]
fn test_filter_unique_and_sample() {
    let engine = engine(SEMICOLON);

    let filters = BTreeMap::from([("Transportmedel".to_string(), "Säng".to_string())]);
    let rows = engine.filter_data(&filters).unwrap();
    assert_eq!(rows.total_rows, 5);
    assert_eq!(rows.returned_rows, 5);

    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(json["data"][0]["Sekundär Servicepersonal Id"], "A");

    let unique = engine.unique_values("Prioritet").unwrap();
    assert_eq!(unique, vec![Cell::Int(1), Cell::Int(3), Cell::Int(2)]);

    assert_eq!(engine.sample(3).unwrap().sample_size, 3);
}

#[test]
fn test_filter_numeric_looking_text_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed_ids.csv");
    std::fs::write(
        &path,
        "Sekundär Servicepersonal Id,Uppdrag Starttid,Uppdrag Sluttid\n\
         A1,2024-03-10 08:00:00,2024-03-10 08:10:00\n\
         101,2024-03-10 08:05:00,2024-03-10 08:15:00\n",
    )
    .unwrap();

    let mut engine = Engine::new(EngineConfig::default());
    engine.load(&path).unwrap();

    let ids: Vec<String> = engine
        .transporter_summary()
        .unwrap()
        .into_iter()
        .map(|s| s.transporter_id)
        .collect();
    assert!(ids.contains(&"101".to_string()));

    let filters = BTreeMap::from([("Sekundär Servicepersonal Id".to_string(), "101".to_string())]);
    let rows = engine.filter_data(&filters).unwrap();
    assert_eq!(rows.total_rows, 1);
    let json = serde_json::to_value(&rows).unwrap();
    assert_eq!(json["data"][0]["Sekundär Servicepersonal Id"], "101");

    assert!(matches!(
        engine.filter_data(&BTreeMap::new()),
        Err(EngineError::NoFilters)
    ));
}

#[test]
fn test_errors() {
    let engine = Engine::new(EngineConfig::default());
    assert!(matches!(engine.data_summary(), Err(EngineError::NoDataLoaded)));
    assert!(matches!(
        engine.run_analysis("heatmap", &AnalysisParams::new()),
        Err(EngineError::UnknownAnalysis(_))
    ));

    let mut engine = Engine::new(EngineConfig::default());
    let missing = engine.load("does/not/exist.csv").unwrap_err();
    assert_eq!(missing.status_code(), 404);
    let unsupported = engine.load("report.xlsx").unwrap_err();
    assert!(matches!(unsupported, EngineError::UnsupportedFormat { .. }));
    assert_eq!(unsupported.status_code(), 400);
}

#[test]
fn test_reload_is_idempotent() {
    let mut engine = engine(SEMICOLON);
    let first = engine.analyze_workload().unwrap().clone();
    let first_summary = engine.transporter_summary().unwrap();

    engine.load(SEMICOLON).unwrap();
    assert_eq!(engine.analyze_workload().unwrap(), &first);
    assert_eq!(engine.transporter_summary().unwrap(), first_summary);
}

#[test]
fn test_custom_ceiling() {
    let config = EngineConfig {
        max_duration_minutes: 60.0,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);
    engine.load(SEMICOLON).unwrap();
    assert_eq!(engine.filtered_count().unwrap(), 0);
    assert_eq!(engine.table().unwrap().len(), 7);
    let report = engine.analyze_workload().unwrap();
    assert_eq!(report.workload_stats[0].total_duration_minutes, 70.0);
}
