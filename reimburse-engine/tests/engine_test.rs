//! End-to-end engine tests against the JSON fixture corpus.

use std::io::Write;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use reimburse_engine::corpus::load_labeled_cases;
use reimburse_engine::{
    EngineConfig, EngineError, LabeledCase, Query, RangeDimension, ReimbursementEngine,
    TrainingCorpus,
};
use tempfile::NamedTempFile;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cases.json")
}

fn engine(config: EngineConfig) -> ReimbursementEngine {
    ReimbursementEngine::from_path(fixture_path(), config).expect("fixture corpus loads")
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_single_case_exact_match() {
    let corpus = TrainingCorpus::from_labeled(&[LabeledCase::new(3, 93.0, 1.42, 364.51)]).unwrap();
    let engine = ReimbursementEngine::new(corpus, EngineConfig::default()).unwrap();

    assert_eq!(engine.estimate(3, 93.0, 1.42).unwrap(), 364.51);
}

#[test]
fn test_known_case_among_neighbours() {
    let engine = engine(EngineConfig::default());
    let amount = engine.estimate(1, 55.0, 3.6).unwrap();
    assert_abs_diff_eq!(amount, 126.06, epsilon = 0.01);
}

#[test]
fn test_every_sample_case_reproduced() {
    let engine = engine(EngineConfig::default());
    let samples = [
        (3, 93.0, 1.42, 364.51),
        (1, 55.0, 3.6, 126.06),
        (1, 47.0, 17.97, 128.91),
        (2, 13.0, 4.67, 203.52),
        (3, 88.0, 5.78, 380.37),
        (7, 1006.0, 1181.33, 2279.82),
        (1, 451.0, 555.49, 162.18),
    ];
    for (days, miles, receipts, expected) in samples {
        let amount = engine.estimate(days, miles, receipts).unwrap();
        assert_abs_diff_eq!(amount, expected, epsilon = 0.01);
    }
}

#[test]
fn test_blended_estimates_off_corpus() {
    let engine = engine(EngineConfig::default());
    let expected = [
        ((2, 60.0, 10.0), 241.59),
        ((4, 321.0, 654.32), 767.50),
        ((12, 1500.0, 2500.0), 1337.77),
        ((50, 20000.0, 50000.0), 1214.78),
        ((1, 5.0, 1.0), 282.12),
        ((6, 400.0, 900.0), 1167.48),
    ];
    for ((days, miles, receipts), amount) in expected {
        let prediction = engine.predict_detailed(&Query::new(days, miles, receipts).unwrap());
        assert!(!prediction.exact_match);
        assert_abs_diff_eq!(prediction.amount, amount, epsilon = 0.001);
    }
}

#[test]
fn test_huge_inputs_still_estimate() {
    let engine = engine(EngineConfig::default());
    let query = Query::new(3, 1e200, 1e200).unwrap();
    let amount = engine.predict(&query);
    assert!(amount.is_finite());
    assert_abs_diff_eq!(amount, engine.summary().mean_outcome, epsilon = 0.01);
    assert_eq!(engine.check_range(&query).len(), 2);
}

#[test]
fn test_far_query_pulled_toward_global_mean() {
    let smoothed = engine(EngineConfig::default());
    let mut config = EngineConfig::default();
    config.smoothing.enabled = false;
    let unsmoothed = engine(config);

    let query = Query::new(50, 20000.0, 50000.0).unwrap();
    let global_mean = smoothed.summary().mean_outcome;

    let with = smoothed.predict_detailed(&query);
    let without = unsmoothed.predict_detailed(&query);

    let weight = with.smoothing.expect("far query is smoothed");
    assert!(weight > 0.0 && weight <= 0.3);
    assert!((with.raw - global_mean).abs() < (without.raw - global_mean).abs());
    assert_abs_diff_eq!(with.ensemble, without.raw, epsilon = 1e-9);

    let warnings = smoothed.check_range(&query);
    assert_eq!(warnings.len(), 3);
    assert_eq!(warnings[0].dimension, RangeDimension::Days);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_repeated_queries_are_identical() {
    let engine = engine(EngineConfig::default());
    let query = Query::new(4, 321.0, 654.32).unwrap();
    let first = engine.predict(&query);
    for _ in 0..5 {
        assert_eq!(engine.predict(&query), first);
    }
}

#[test]
fn test_smoothing_stays_between_ensemble_and_mean() {
    let engine = engine(EngineConfig::default());
    let queries = [
        (1, 5.0, 1.0),
        (12, 1500.0, 2500.0),
        (20, 3000.0, 100.0),
        (9, 10.0, 4000.0),
    ];
    for (days, miles, receipts) in queries {
        let prediction = engine.predict_detailed(&Query::new(days, miles, receipts).unwrap());
        if let Some(weight) = prediction.smoothing {
            assert!(weight <= 0.3);
            let lo = prediction.ensemble.min(prediction.global_mean);
            let hi = prediction.ensemble.max(prediction.global_mean);
            assert!(prediction.raw >= lo - 1e-9 && prediction.raw <= hi + 1e-9);
        }
    }
}

#[test]
fn test_fast_variant_reproduces_known_cases() {
    let engine = engine(EngineConfig::fast());
    assert_eq!(engine.estimate(2, 13.0, 4.67).unwrap(), 203.52);

    let prediction = engine.predict_detailed(&Query::new(4, 321.0, 654.32).unwrap());
    assert_eq!(prediction.members.len(), 1);
    assert!(prediction.smoothing.is_none());
}

#[test]
fn test_concurrent_queries_match_sequential() {
    let engine = engine(EngineConfig::default());
    let queries: Vec<Query> = (1..=16)
        .map(|i| Query::new(i % 9 + 1, 40.0 * i as f64, 75.5 * i as f64).unwrap())
        .collect();
    let sequential: Vec<f64> = queries.iter().map(|q| engine.predict(q)).collect();

    let parallel: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|q| {
                let engine = &engine;
                scope.spawn(move || engine.predict(q))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(parallel, sequential);
}

#[test]
fn test_evaluate_fixture() {
    let engine = engine(EngineConfig::default());
    let cases = load_labeled_cases(fixture_path()).unwrap();
    let report = engine.evaluate(&cases, 5);

    assert_eq!(report.total, cases.len());
    assert_eq!(report.exact_matches, cases.len());
    assert_eq!(report.rejected, 0);
    assert!(report.worst.len() <= 5);
}

// =============================================================================
// Loading failures
// =============================================================================

#[test]
fn test_load_from_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"input": {{"trip_duration_days": 2, "miles_traveled": 10, "total_receipts_amount": 4.5}}, "expected_output": 150.25}}]"#
    )
    .unwrap();

    let engine = ReimbursementEngine::from_path(file.path(), EngineConfig::default()).unwrap();
    assert_eq!(engine.corpus().len(), 1);
    assert_eq!(engine.estimate(2, 10.0, 4.5).unwrap(), 150.25);
}

#[test]
fn test_empty_file_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[]").unwrap();

    let err = ReimbursementEngine::from_path(file.path(), EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::EmptyCorpus));
    assert!(err.is_fatal());
}

#[test]
fn test_garbage_file_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let err = ReimbursementEngine::from_path(file.path(), EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::CorpusFormat(_)));
}

#[test]
fn test_missing_file_is_fatal() {
    let err = ReimbursementEngine::from_path("/no/such/corpus.json", EngineConfig::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::CorpusIo { .. }));
    assert!(err.to_string().contains("/no/such/corpus.json"));
}
