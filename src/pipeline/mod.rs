//! End-to-end training run: ingestion, validation, transformation, training,
//! evaluation and promotion, each stage timed and logged.
//!
//! Any fatal error aborts the remaining stages. The production bundle is only
//! touched by the promotion stage itself.

use std::path::PathBuf;

use ndarray::Axis;
use serde::Serialize;

use crate::artifact::{ArtifactStore, RunNamespace};
use crate::common::config::AppCfg;
use crate::common::error::{AdmitCode, AdmitError, AdmitResult};
use crate::common::ids::RunId;
use crate::common::log::stage_event;
use crate::common::time;
use crate::data::repo_fs::read_csv;
use crate::data::service::{persist_split, split};
use crate::data::{DataSourceAdapter, Dataset, Frame, SchemaSpec};
use crate::evaluation::service::persist_ranking;
use crate::evaluation::{evaluate, select_best, EvaluationResult, Ranking};
use crate::registry::domain::{BundleMetrics, TargetMetrics};
use crate::registry::service::persist_decision;
use crate::registry::{promote, FsPromotionRepo, ProductionBundle, PromotionDecision, PromotionRepo};
use crate::training::repo_fs::persist_candidates;
use crate::training::{Target, TrainedModel, Trainer};
use crate::transform;
use crate::validation::service::persist_report;
use crate::validation::{validate, DriftReport};

/// Summary of one run.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub run_id: RunId,
    pub run_dir: PathBuf,
    pub rows: usize,
    pub drift: DriftReport,
    pub ranking: Ranking,
    pub decision: PromotionDecision,
}

/// Schema from `ADMIT_SCHEMA` when set, the built-in one otherwise.
pub fn load_schema(cfg: &AppCfg) -> AdmitResult<SchemaSpec> {
    match &cfg.schema_path {
        Some(path) => SchemaSpec::from_yaml_file(path),
        None => Ok(SchemaSpec::default()),
    }
}

/// Top-ranked candidate of one target with its holdout metrics.
fn best_of(
    target: Target,
    pool: &[TrainedModel],
    ranking: &[EvaluationResult],
) -> AdmitResult<(TrainedModel, TargetMetrics)> {
    let top = ranking
        .first()
        .ok_or_else(|| AdmitError::training(target, "no ranked candidate"))?;
    let model = select_best(pool, ranking)
        .ok_or_else(|| AdmitError::training(target, "ranked candidate is missing"))?;
    Ok((model.clone(), TargetMetrics::new(model, top)))
}

fn timed<T>(stage: &str, f: impl FnOnce() -> AdmitResult<T>) -> AdmitResult<T> {
    let span = tracing::info_span!("stage", stage);
    let _enter = span.enter();
    let start = time::now_ms();
    let result = f();
    let dur = time::now_ms().saturating_sub(start);
    match &result {
        Ok(_) => stage_event(stage, "completed", AdmitCode::Ok, dur),
        Err(err) => stage_event(stage, "failed", err.code(), dur),
    }
    result
}

pub struct TrainingPipeline {
    cfg: AppCfg,
    schema: SchemaSpec,
    adapter: DataSourceAdapter,
    store: ArtifactStore,
    promotions: FsPromotionRepo,
}

impl TrainingPipeline {
    pub fn new(cfg: AppCfg, schema: SchemaSpec, adapter: DataSourceAdapter) -> Self {
        Self {
            store: ArtifactStore::new(&cfg.artifact_root),
            promotions: FsPromotionRepo::new(cfg.best_model_dir()),
            cfg,
            schema,
            adapter,
        }
    }

    pub fn from_cfg(cfg: AppCfg) -> AdmitResult<Self> {
        cfg.pipeline.validate()?;
        let schema = load_schema(&cfg)?;
        let adapter = DataSourceAdapter::from_cfg(&cfg, &schema)?;
        Ok(Self::new(cfg, schema, adapter))
    }

    /// Reference for drift: configured snapshot, then the production
    /// reference, then `None` (compare the data with itself). An unusable
    /// option is logged and the next one is tried.
    fn reference(&self) -> Option<Dataset> {
        if let Some(path) = &self.cfg.pipeline.reference_snapshot {
            match read_csv(path).and_then(|f| self.schema.parse_frame(&f)) {
                Ok(reference) => return Some(reference),
                Err(err) => tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "configured reference unusable, trying production reference"
                ),
            }
        }
        let production = self
            .promotions
            .reference()
            .and_then(|frame| frame.map(|f| self.schema.parse_frame(&f)).transpose());
        match production {
            Ok(reference) => reference,
            Err(err) => {
                tracing::warn!(error = %err, "production reference unusable, comparing with incoming data");
                None
            }
        }
    }

    pub fn run(&self) -> AdmitResult<PipelineOutcome> {
        let ns = self.store.begin_run()?;
        tracing::info!(run = %ns.run_id, dir = %ns.dir.display(), "pipeline run started");
        let outcome = self.run_in(&ns);
        if let Err(err) = &outcome {
            tracing::error!(run = %ns.run_id, code = err.code().as_u32(), error = %err, "pipeline run aborted");
        }
        outcome
    }

    fn run_in(&self, ns: &RunNamespace) -> AdmitResult<PipelineOutcome> {
        let pipeline = &self.cfg.pipeline;

        let frame: Frame = timed("data_ingestion", || self.adapter.fetch(ns))?;

        let (dataset, drift, train, test) = timed("data_validation", || {
            let reference = match self.reference() {
                Some(reference) => reference,
                None => self.schema.parse_frame(&frame)?,
            };
            let (dataset, drift) = validate(&frame, &self.schema, &reference, &pipeline.drift)?;
            persist_report(ns, &drift)?;
            let (train, test) = split(&dataset, pipeline.test_ratio, pipeline.seed);
            persist_split(ns, &train, &test)?;
            Ok((dataset, drift, train, test))
        })?;

        let (state, x_train, x_test) = timed("data_transformation", || {
            let state = transform::fit(&train.records);
            let x_train = transform::apply_batch(&state, &train.records);
            let x_test = transform::apply_batch(&state, &test.records);
            transform::service::persist(
                ns,
                &state,
                (&x_train, &train.admission_labels(), &train.scholarship_labels()),
                (&x_test, &test.admission_labels(), &test.scholarship_labels()),
            )?;
            Ok((state, x_train, x_test))
        })?;

        let candidates = timed("model_trainer", || {
            let out = Trainer::new(pipeline).train(
                &ns.run_id,
                &x_train,
                &train.admission_labels(),
                &train.scholarship_labels(),
            )?;
            persist_candidates(ns, &out)?;
            Ok(out)
        })?;

        let ranking = timed("model_evaluation", || {
            let admitted: Vec<usize> = (0..test.len()).filter(|&i| test.labels[i].admitted).collect();
            let x_admitted = x_test.select(Axis(0), &admitted);
            let y_scholarship: Vec<bool> = admitted.iter().map(|&i| test.labels[i].scholarship).collect();
            let ranking = Ranking {
                admission: evaluate(&candidates.admission, &x_test, &test.admission_labels()),
                scholarship: evaluate(&candidates.scholarship, &x_admitted, &y_scholarship),
            };
            persist_ranking(ns, &ranking)?;
            Ok(ranking)
        })?;

        let decision = timed("model_promotion", || {
            let (admission, admission_metrics) =
                best_of(Target::Admission, &candidates.admission, &ranking.admission)?;
            let (scholarship, scholarship_metrics) =
                best_of(Target::Scholarship, &candidates.scholarship, &ranking.scholarship)?;
            let bundle = ProductionBundle {
                run_id: ns.run_id.clone(),
                promoted_at: String::new(),
                transformer: state.clone(),
                admission,
                scholarship,
                metrics: BundleMetrics::new(admission_metrics, scholarship_metrics),
            };
            let decision = promote(&self.promotions, bundle, &dataset.to_frame(), pipeline.promotion_min_delta)?;
            persist_decision(ns, &decision)?;
            Ok(decision)
        })?;

        Ok(PipelineOutcome {
            run_id: ns.run_id.clone(),
            run_dir: ns.dir.clone(),
            rows: dataset.len(),
            drift,
            ranking,
            decision,
        })
    }

    pub fn promotions(&self) -> &dyn PromotionRepo {
        &self.promotions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repo_fs::SnapshotStore;
    use crate::data::domain::FRAME_COLUMNS;

    fn frame(rows: usize) -> Frame {
        let columns = FRAME_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = (0..rows)
            .map(|i| {
                let admitted = i % 2 == 0;
                [
                    format!("a{i}"),
                    "postgraduate".into(),
                    "kenya".into(),
                    "physics".into(),
                    "chinese_taught".into(),
                    format!("{}", 2.0 + (i % 5) as f64 * 0.3),
                    "5".into(),
                    "5".into(),
                    "1".into(),
                    "5".into(),
                    "60".into(),
                    String::new(),
                    String::new(),
                    "hsk4".into(),
                    if admitted { "admitted" } else { "rejected" }.into(),
                    "no_scholarship".into(),
                ]
                .to_vec()
            })
            .collect();
        Frame::new(columns, rows)
    }

    #[test]
    fn unusable_configured_reference_falls_back_to_production() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppCfg::local(dir.path().join("artifact"), dir.path().join("snapshots"));
        cfg.pipeline.reference_snapshot = Some(dir.path().join("missing.csv"));
        let schema = SchemaSpec::default();
        let adapter = DataSourceAdapter::new(None, SnapshotStore::new(&cfg.snapshot_dir), &schema);
        let pipeline = TrainingPipeline::new(cfg, schema, adapter);
        assert!(pipeline.reference().is_none());

        let production = frame(6);
        let bundle_dir = pipeline.promotions.dir().to_path_buf();
        std::fs::create_dir_all(&bundle_dir).unwrap();
        crate::artifact::repo_fs::write_csv(
            &bundle_dir.join(crate::registry::repo_fs::REFERENCE_FILE),
            &production.columns,
            &production.rows,
        )
        .unwrap();

        let reference = pipeline.reference().unwrap();
        assert_eq!(reference.len(), 6);
    }
}
