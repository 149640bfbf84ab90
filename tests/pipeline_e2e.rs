mod common;

use admit_core::artifact::Stage;
use admit_core::common::error::AdmitError;
use admit_core::data::remote::RemoteSource;
use admit_core::data::repo_fs::SnapshotStore;
use admit_core::data::{DataSourceAdapter, SchemaSpec};
use admit_core::evaluation::service::RANKING_FILE;
use admit_core::registry::repo_fs::{HISTORY_DIR, METRICS_FILE, MODEL_FILE, REFERENCE_FILE};
use admit_core::registry::service::DECISION_FILE;
use admit_core::registry::{PromotionOutcome, PromotionRepo};
use admit_core::{AdmitResult, InferenceService, TrainingPipeline};
use serde_json::{Map, Value};

use common::{chinese_applicant, english_applicant, workspace};

struct UnreachableRemote;

impl RemoteSource for UnreachableRemote {
    fn find_all(&self) -> AdmitResult<Vec<Map<String, Value>>> {
        Err(AdmitError::Remote("connection refused".into()))
    }

    fn describe(&self) -> String {
        "remote:unreachable".into()
    }
}

#[test]
fn first_run_promotes_and_serves_predictions() {
    let ws = workspace();
    let best = ws.cfg.best_model_dir();
    let outcome = TrainingPipeline::from_cfg(ws.cfg.clone()).unwrap().run().unwrap();

    assert_eq!(outcome.rows, 100);
    assert_eq!(outcome.decision.outcome, PromotionOutcome::Promoted);
    assert!(outcome.decision.previous.is_none());
    assert!(!outcome.drift.dataset_drifted);
    assert!(!outcome.ranking.admission.is_empty());
    assert!(!outcome.ranking.scholarship.is_empty());

    for file in [MODEL_FILE, METRICS_FILE, REFERENCE_FILE] {
        assert!(best.join(file).is_file(), "{file} missing");
    }
    let eval_dir = outcome.run_dir.join(Stage::ModelEvaluation.dir_name());
    assert!(eval_dir.join(RANKING_FILE).is_file());
    assert!(eval_dir.join(DECISION_FILE).is_file());

    let service = InferenceService::new(&best, SchemaSpec::default());
    let english = service.predict_json(&english_applicant()).unwrap();
    assert!((0.0..=1.0).contains(&english.admission_probability));
    assert_eq!(
        english.scholarship_probability.is_some(),
        english.admission_decision == "admitted"
    );

    // Unknown country and a Chinese track still go through.
    let chinese = service.predict_json(&chinese_applicant()).unwrap();
    assert!((0.0..=1.0).contains(&chinese.admission_probability));
}

#[test]
fn repeated_predictions_are_bit_identical() {
    let ws = workspace();
    TrainingPipeline::from_cfg(ws.cfg.clone()).unwrap().run().unwrap();
    let service = InferenceService::new(ws.cfg.best_model_dir(), SchemaSpec::default());
    let fresh = InferenceService::new(ws.cfg.best_model_dir(), SchemaSpec::default());

    for payload in [english_applicant(), chinese_applicant()] {
        let first = service.predict_json(&payload).unwrap();
        let second = service.predict_json(&payload).unwrap();
        let other = fresh.predict_json(&payload).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, other);
        assert_eq!(
            first.admission_probability.to_bits(),
            second.admission_probability.to_bits()
        );
        assert_eq!(
            first.scholarship_probability.map(f64::to_bits),
            other.scholarship_probability.map(f64::to_bits)
        );
    }
}

#[test]
fn inference_before_any_promotion_is_unavailable() {
    let ws = workspace();
    let service = InferenceService::new(ws.cfg.best_model_dir(), SchemaSpec::default());
    assert!(matches!(
        service.predict_json(&english_applicant()),
        Err(AdmitError::ModelNotLoaded)
    ));
}

#[test]
fn unreachable_remote_falls_back_to_snapshot() {
    let ws = workspace();
    let schema = SchemaSpec::default();
    let adapter = DataSourceAdapter::new(
        Some(Box::new(UnreachableRemote)),
        SnapshotStore::new(&ws.cfg.snapshot_dir),
        &schema,
    );
    let outcome = TrainingPipeline::new(ws.cfg.clone(), schema, adapter).run().unwrap();
    assert_eq!(outcome.rows, 100);
    assert_eq!(outcome.decision.outcome, PromotionOutcome::Promoted);
}

#[test]
fn missing_data_aborts_without_touching_production() {
    let ws = workspace();
    let mut cfg = ws.cfg.clone();
    cfg.snapshot_dir = ws.dir.path().join("empty");

    let err = TrainingPipeline::from_cfg(cfg.clone()).unwrap().run().unwrap_err();
    assert!(matches!(err, AdmitError::DataUnavailable(_)));
    assert!(!cfg.best_model_dir().join(MODEL_FILE).exists());
}

#[test]
fn identical_rerun_keeps_production_bundle() {
    let ws = workspace();
    let pipeline = TrainingPipeline::from_cfg(ws.cfg.clone()).unwrap();
    let first = pipeline.run().unwrap();
    let second = pipeline.run().unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.decision.outcome, PromotionOutcome::Retained);
    assert_eq!(second.decision.previous_run.as_ref(), Some(&first.run_id));
    assert!(!second.drift.dataset_drifted);

    let current = pipeline.promotions().current().unwrap().unwrap();
    assert_eq!(current.run_id, first.run_id);
    assert!(!ws.cfg.best_model_dir().join(HISTORY_DIR).join(format!("{}.json", first.run_id)).exists());
}

#[test]
fn better_candidate_replaces_production_and_archives_it() {
    let ws = workspace();
    let best = ws.cfg.best_model_dir();
    let pipeline = TrainingPipeline::from_cfg(ws.cfg.clone()).unwrap();
    let first = pipeline.run().unwrap();

    // Degrade the stored production score so the next run clears the gate.
    let mut bundle = pipeline.promotions().current().unwrap().unwrap();
    bundle.metrics.combined = -1.0;
    std::fs::write(best.join(MODEL_FILE), serde_json::to_vec(&bundle).unwrap()).unwrap();

    let second = pipeline.run().unwrap();
    assert_eq!(second.decision.outcome, PromotionOutcome::Promoted);
    assert_eq!(second.decision.previous, Some(-1.0));
    let current = pipeline.promotions().current().unwrap().unwrap();
    assert_eq!(current.run_id, second.run_id);
    assert!(best.join(HISTORY_DIR).join(format!("{}.json", first.run_id)).is_file());
}
