//! Promotion gate.

use crate::artifact::repo_fs::write_json;
use crate::artifact::{RunNamespace, Stage};
use crate::common::error::{AdmitCode, AdmitError, AdmitResult};
use crate::common::time;
use crate::data::Frame;

use super::domain::{ProductionBundle, PromotionDecision, PromotionOutcome, PromotionRepo};

pub const DECISION_FILE: &str = "decision.json";

/// Bootstrap always promotes; otherwise the gain must exceed `min_delta`.
pub fn decide(current: Option<f64>, new: f64, min_delta: f64) -> PromotionOutcome {
    match current {
        None => PromotionOutcome::Promoted,
        Some(current) if new - current > min_delta => PromotionOutcome::Promoted,
        Some(_) => PromotionOutcome::Retained,
    }
}

/// Compare `candidate` with production and install it when it wins.
pub fn promote(
    repo: &dyn PromotionRepo,
    mut candidate: ProductionBundle,
    reference: &Frame,
    min_delta: f64,
) -> AdmitResult<PromotionDecision> {
    let mut decision = None;
    repo.exclusive(&mut || {
        let current = repo.current()?;
        let previous = current.as_ref().map(|b| b.metrics.combined);
        let new = candidate.metrics.combined;
        let outcome = decide(previous, new, min_delta);
        let made = PromotionDecision {
            run_id: candidate.run_id.clone(),
            outcome,
            previous_run: current.map(|b| b.run_id),
            previous,
            new,
            delta: previous.map(|p| new - p),
            min_delta,
        };
        match outcome {
            PromotionOutcome::Promoted => {
                candidate.promoted_at = time::now_rfc3339();
                repo.install(&candidate, reference)?;
                tracing::info!(run = %made.run_id, new, ?previous, "model promoted");
            }
            PromotionOutcome::Retained => tracing::info!(
                run = %made.run_id,
                code = AdmitCode::PromotionSkipped.as_u32(),
                new,
                ?previous,
                "production model retained"
            ),
        }
        decision = Some(made);
        Ok(())
    })?;
    decision.ok_or_else(|| AdmitError::Io(std::io::Error::other("promotion lock body did not run")))
}

pub fn persist_decision(ns: &RunNamespace, decision: &PromotionDecision) -> AdmitResult<()> {
    write_json(&ns.path(Stage::ModelEvaluation, DECISION_FILE), decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ids::RunId;
    use crate::registry::domain::{BundleMetrics, TargetMetrics};
    use crate::registry::repo_fs::FsPromotionRepo;
    use crate::training::domain::{Family, FittedModel, Params, Target, TrainedModel};
    use crate::training::models::{TreeModel, TreeNode};
    use crate::transform::TransformerState;

    fn bundle(run: &str, f1: f64) -> ProductionBundle {
        let model = |target| TrainedModel {
            run_id: RunId::new(run),
            target,
            family: Family::DecisionTree,
            params: Params::new(),
            cv_score: f1,
            model: FittedModel::DecisionTree(TreeModel {
                nodes: vec![TreeNode::Leaf { proba: 1.0 }],
            }),
        };
        let metrics = |f1| TargetMetrics {
            family: Family::DecisionTree,
            params: Params::new(),
            f1,
            precision: f1,
            recall: f1,
        };
        ProductionBundle {
            run_id: RunId::new(run),
            promoted_at: String::new(),
            transformer: TransformerState {
                numeric: vec![],
                categorical: vec![],
                fitted_rows: 0,
            },
            admission: model(Target::Admission),
            scholarship: model(Target::Scholarship),
            metrics: BundleMetrics::new(metrics(f1), metrics(f1)),
        }
    }

    #[test]
    fn gain_must_strictly_exceed_min_delta() {
        assert_eq!(decide(None, 0.0, 0.07), PromotionOutcome::Promoted);
        assert_eq!(decide(Some(0.5), 0.57, 0.07), PromotionOutcome::Retained);
        assert_eq!(decide(Some(0.5), 0.58, 0.07), PromotionOutcome::Promoted);
        assert_eq!(decide(Some(0.5), 0.4, 0.0), PromotionOutcome::Retained);
    }

    #[test]
    fn promotion_archives_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsPromotionRepo::new(dir.path().join("best_model"));
        let reference = Frame::new(vec!["country".into()], vec![vec!["chad".into()]]);

        let first = promote(&repo, bundle("run-a", 0.5), &reference, 0.07).unwrap();
        assert_eq!(first.outcome, PromotionOutcome::Promoted);
        assert_eq!(first.previous, None);

        let retained = promote(&repo, bundle("run-b", 0.55), &reference, 0.07).unwrap();
        assert_eq!(retained.outcome, PromotionOutcome::Retained);
        assert_eq!(repo.current().unwrap().unwrap().run_id.as_str(), "run-a");

        let second = promote(&repo, bundle("run-c", 0.9), &reference, 0.07).unwrap();
        assert_eq!(second.outcome, PromotionOutcome::Promoted);
        assert_eq!(second.previous_run.unwrap().as_str(), "run-a");
        assert_eq!(repo.current().unwrap().unwrap().run_id.as_str(), "run-c");
        assert!(repo.dir().join("history").join("run-a.json").is_file());
        assert!(repo.dir().join("metrics.yaml").is_file());
        assert_eq!(repo.reference().unwrap().unwrap(), reference);
    }

    #[test]
    fn concurrent_promotions_never_regress_production() {
        for _ in 0..8 {
            let dir = tempfile::tempdir().unwrap();
            let best = dir.path().join("best_model");
            let reference = Frame::new(vec!["country".into()], vec![vec!["chad".into()]]);
            promote(&FsPromotionRepo::new(&best), bundle("base", 0.5), &reference, 0.07).unwrap();

            let barrier = std::sync::Barrier::new(2);
            std::thread::scope(|scope| {
                for (run, f1) in [("good", 0.95), ("ok", 0.6)] {
                    let (best, reference, barrier) = (&best, &reference, &barrier);
                    scope.spawn(move || {
                        let repo = FsPromotionRepo::new(best);
                        barrier.wait();
                        promote(&repo, bundle(run, f1), reference, 0.07).unwrap()
                    });
                }
            });

            let current = FsPromotionRepo::new(&best).current().unwrap().unwrap();
            assert_eq!(current.run_id.as_str(), "good");
            assert_eq!(current.metrics.combined, 0.95);
        }
    }

    #[test]
    fn sidecars_match_the_installed_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsPromotionRepo::new(dir.path().join("best_model"));
        let reference = Frame::new(vec!["country".into()], vec![vec!["chad".into()]]);
        promote(&repo, bundle("run-a", 0.5), &reference, 0.07).unwrap();
        promote(&repo, bundle("run-b", 0.9), &reference, 0.07).unwrap();

        let card: crate::registry::domain::MetricsCard =
            serde_yaml::from_str(&std::fs::read_to_string(repo.dir().join("metrics.yaml")).unwrap())
                .unwrap();
        assert_eq!(card.run_id, repo.current().unwrap().unwrap().run_id);
        assert!(repo.dir().join(crate::registry::repo_fs::LOCK_FILE).is_file());
    }
}
