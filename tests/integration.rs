//! End-to-end searches over mixed spaces: warm-up through modeling,
//! weighted interleaving, failure isolation, and snapshot resumption.

use hypertune::{
    Assignment, Dimension, Error, Estimator, FoldSource, ParamValue, Phase, Search, SearchConfig,
    SearchSnapshot, Space,
};

/// Synthetic "dataset": a per-fold shift so folds are distinguishable.
struct ShiftFolds;

impl FoldSource for ShiftFolds {
    type Data = f64;

    fn folds(&self, k: usize) -> Vec<(f64, f64)> {
        (0..k).map(|i| (0.01 * i as f64, 0.0)).collect()
    }
}

/// Scores a mixed configuration: a log-scaled rate, a layer count, and a
/// categorical activation. Best near rate = 1e-2, layers = 3, act = 1.
struct MixedModel;

impl Estimator for MixedModel {
    type Data = f64;
    type Fitted = f64;
    type Error = String;

    fn fit(&self, params: &Assignment, train: &f64) -> Result<f64, String> {
        let rate = params
            .get("rate")
            .and_then(ParamValue::as_float)
            .ok_or("missing 'rate'")?;
        let layers = params
            .get("layers")
            .and_then(ParamValue::as_int)
            .ok_or("missing 'layers'")?;
        let act = params
            .get("act")
            .and_then(ParamValue::as_index)
            .ok_or("missing 'act'")?;

        let rate_term = (rate.log10() + 2.0).powi(2);
        let layer_term = 0.1 * (layers - 3).pow(2) as f64;
        let act_term = if act == 1 { 0.0 } else { 0.5 };
        Ok(rate_term + layer_term + act_term + train)
    }

    fn score(&self, fitted: &f64, _validation: &f64) -> Result<f64, String> {
        Ok(-fitted)
    }
}

fn mixed_space() -> Space {
    Space::new()
        .add("rate", Dimension::log_continuous(1e-6, 1e6).unwrap())
        .unwrap()
        .add("layers", Dimension::integer(1, 8).unwrap())
        .unwrap()
        .add("act", Dimension::categorical(3).unwrap())
        .unwrap()
}

fn mixed_search(config: SearchConfig) -> Search<MixedModel, ShiftFolds> {
    Search::new(MixedModel, ShiftFolds, config)
}

#[test]
fn modeling_proposals_stay_within_log_scaled_bounds() {
    let mut search = mixed_search(
        SearchConfig::new()
            .random_state(11)
            .n_initial_points(4)
            .cv_folds(3)
            .n_candidates(200),
    );
    search.register("net", mixed_space(), 14).unwrap();
    search.run_to_completion().unwrap();

    let tuner = search.entries()[0].tuner();
    assert_eq!(tuner.phase(), Phase::Exhausted);
    assert_eq!(tuner.history().len(), 14);

    // Well past the 4-point warm-up, so the surrogate drove most proposals;
    // every decoded assignment must respect the declared bounds and types.
    for obs in tuner.history() {
        let rate = obs.params["rate"].as_float().unwrap();
        assert!((1e-6..=1e6).contains(&rate), "rate {rate} out of bounds");

        let layers = obs.params["layers"].as_int().unwrap();
        assert!((1..=8).contains(&layers), "layers {layers} out of bounds");

        let act = obs.params["act"].as_index().unwrap();
        assert!(act < 3, "act index {act} out of range");

        for &t in &obs.vector {
            assert!((0.0..=1.0).contains(&t), "normalized coord {t} escaped");
        }
    }
}

#[test]
fn weights_are_spent_exactly_and_proportionally() {
    let mut search = mixed_search(SearchConfig::new().random_state(4).cv_folds(2));
    search.register("small", mixed_space(), 16).unwrap();
    search.register("large", mixed_space(), 32).unwrap();

    let mut evaluated = 0;
    while search.remaining_total() > 0 {
        let outcome = search.step(None).unwrap();
        evaluated += outcome.evaluated;
    }
    assert_eq!(evaluated, 48);

    for entry in search.entries() {
        assert_eq!(entry.tuner().remaining(), 0);
        assert_eq!(entry.tuner().phase(), Phase::Exhausted);
        assert_eq!(
            entry.tuner().history().len(),
            entry.weight_total() as usize
        );
    }

    // Once drained, further steps are no-ops, not errors.
    assert!(search.step(None).unwrap().is_noop());
    assert!(search.step(Some("small")).unwrap().is_noop());
}

#[test]
fn identical_seeds_reproduce_identical_runs() {
    let run = || {
        let mut search = mixed_search(
            SearchConfig::new()
                .random_state(77)
                .cv_folds(2)
                .n_candidates(100),
        );
        search.register("net", mixed_space(), 12).unwrap();
        search.run_to_completion().unwrap();
        let tuner = search.entries()[0].tuner();
        (tuner.history().to_vec(), search.best().unwrap().score)
    };

    let (history_a, best_a) = run();
    let (history_b, best_b) = run();
    assert_eq!(history_a, history_b);
    assert_eq!(best_a.to_bits(), best_b.to_bits());
}

/// Fails whenever the categorical picks the forbidden branch.
struct FlakyModel;

impl Estimator for FlakyModel {
    type Data = f64;
    type Fitted = f64;
    type Error = String;

    fn fit(&self, params: &Assignment, _train: &f64) -> Result<f64, String> {
        let x = params
            .get("x")
            .and_then(ParamValue::as_float)
            .ok_or("missing 'x'")?;
        let branch = params
            .get("branch")
            .and_then(ParamValue::as_index)
            .ok_or("missing 'branch'")?;
        if branch == 0 {
            return Err("branch 0 is not trainable".to_string());
        }
        Ok(x)
    }

    fn score(&self, fitted: &f64, _validation: &f64) -> Result<f64, String> {
        Ok(-(fitted - 0.5).powi(2))
    }
}

#[test]
fn failed_evaluations_are_recorded_but_never_best() {
    let space = Space::new()
        .add("x", Dimension::continuous(0.0, 1.0).unwrap())
        .unwrap()
        .add("branch", Dimension::categorical(2).unwrap())
        .unwrap();

    let mut search = Search::new(
        FlakyModel,
        ShiftFolds,
        SearchConfig::new()
            .random_state(21)
            .n_initial_points(14)
            .cv_folds(2),
    );
    search.register("flaky", space, 20).unwrap();

    let mut failure_count = 0;
    while search.remaining_total() > 0 {
        let outcome = search.step(None).unwrap();
        for (params, cause) in &outcome.failures {
            assert_eq!(params["branch"].as_index(), Some(0));
            assert!(cause.contains("not trainable"));
            failure_count += 1;
        }
    }

    // Budget is consumed by failures too.
    assert_eq!(search.entries()[0].tuner().history().len(), 20);
    assert!(
        failure_count > 0,
        "14 random warm-up draws over a binary branch should hit branch 0"
    );

    // The best result comes only from successful evaluations.
    let best = search.best().unwrap();
    assert_eq!(best.params["branch"].as_index(), Some(1));
    assert!(best.fitted.is_some());

    // Failed points carry the worst finite objective, never infinity.
    for obs in search.entries()[0].tuner().history() {
        assert!(obs.objective.is_finite());
    }
}

#[test]
fn snapshot_restore_resumes_bit_for_bit() {
    let config = || {
        SearchConfig::new()
            .random_state(55)
            .cv_folds(2)
            .n_candidates(100)
    };

    let mut original = mixed_search(config());
    original.register("net", mixed_space(), 18).unwrap();
    for _ in 0..5 {
        original.step(None).unwrap();
    }

    let path = std::env::temp_dir().join("hypertune-resume-test.json");
    original.snapshot().save(&path).unwrap();

    let mut resumed = mixed_search(config());
    resumed.register("net", mixed_space(), 18).unwrap();
    resumed.restore(SearchSnapshot::load(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(
        resumed.entries()[0].tuner().remaining(),
        original.entries()[0].tuner().remaining()
    );
    assert_eq!(
        resumed.entries()[0].tuner().history(),
        original.entries()[0].tuner().history()
    );
    assert_eq!(
        resumed.best().unwrap().score.to_bits(),
        original.best().unwrap().score.to_bits()
    );
    // Fitted handles are not persisted.
    assert!(resumed.best().unwrap().fitted.is_none());

    // Both instances must now propose and record identical trajectories.
    original.run_to_completion().unwrap();
    resumed.run_to_completion().unwrap();
    assert_eq!(
        resumed.entries()[0].tuner().history(),
        original.entries()[0].tuner().history()
    );
    assert_eq!(
        resumed.best().unwrap().score.to_bits(),
        original.best().unwrap().score.to_bits()
    );
}

#[test]
fn restore_rejects_mismatched_registrations() {
    let mut original = mixed_search(SearchConfig::new().random_state(1).cv_folds(2));
    original.register("net", mixed_space(), 8).unwrap();
    original.step(None).unwrap();
    let snapshot = original.snapshot();

    // Different name.
    let mut other = mixed_search(SearchConfig::new().random_state(1).cv_folds(2));
    other.register("other", mixed_space(), 8).unwrap();
    assert!(matches!(
        other.restore(snapshot.clone()),
        Err(Error::ResumeMismatch { .. })
    ));

    // Different total weight.
    let mut other = mixed_search(SearchConfig::new().random_state(1).cv_folds(2));
    other.register("net", mixed_space(), 9).unwrap();
    assert!(matches!(
        other.restore(snapshot.clone()),
        Err(Error::ResumeMismatch { .. })
    ));

    // Different space definition.
    let shrunk = Space::new()
        .add("rate", Dimension::log_continuous(1e-6, 1e2).unwrap())
        .unwrap();
    let mut other = mixed_search(SearchConfig::new().random_state(1).cv_folds(2));
    other.register("net", shrunk, 8).unwrap();
    assert!(matches!(
        other.restore(snapshot.clone()),
        Err(Error::ResumeMismatch { .. })
    ));

    // Unsupported version.
    let mut stale = snapshot;
    stale.version += 1;
    let mut other = mixed_search(SearchConfig::new().random_state(1).cv_folds(2));
    other.register("net", mixed_space(), 8).unwrap();
    assert!(matches!(
        other.restore(stale),
        Err(Error::ResumeMismatch { .. })
    ));
}

#[test]
fn parallel_batches_match_budget_accounting() {
    let mut search = mixed_search(
        SearchConfig::new()
            .random_state(31)
            .cv_folds(2)
            .n_jobs(4)
            .n_candidates(100),
    );
    search.register("net", mixed_space(), 10).unwrap();

    let outcome = search.step(None).unwrap();
    assert_eq!(outcome.evaluated, 4);
    assert_eq!(search.entries()[0].tuner().remaining(), 6);

    search.step(None).unwrap();
    let outcome = search.step(None).unwrap();
    assert_eq!(outcome.evaluated, 2, "last batch capped by remaining weight");
    assert_eq!(search.remaining_total(), 0);
}

#[test]
fn best_score_improves_over_random_start() {
    let mut search = mixed_search(
        SearchConfig::new()
            .random_state(13)
            .n_initial_points(5)
            .cv_folds(2)
            .n_candidates(300),
    );
    search.register("net", mixed_space(), 30).unwrap();

    // Score of the best point after warm-up only.
    for _ in 0..5 {
        search.step(None).unwrap();
    }
    let warmup_best = search.best().unwrap().score;

    search.run_to_completion().unwrap();
    let final_best = search.best().unwrap().score;
    assert!(
        final_best >= warmup_best,
        "best regressed: {final_best} < {warmup_best}"
    );
}
