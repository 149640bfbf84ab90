//! Filesystem persistence of trained candidates.

use crate::artifact::repo_fs::write_json;
use crate::artifact::{RunNamespace, Stage};
use crate::common::error::AdmitResult;

use super::domain::TrainingOutput;

pub const CANDIDATES_FILE: &str = "trained_model/candidates.json";

pub fn persist_candidates(ns: &RunNamespace, output: &TrainingOutput) -> AdmitResult<()> {
    write_json(&ns.path(Stage::ModelTrainer, CANDIDATES_FILE), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::repo_fs::read_json;
    use crate::artifact::ArtifactStore;
    use crate::common::ids::RunId;
    use crate::training::domain::{Family, Params, Target, TrainedModel};
    use crate::training::models::build_estimator;
    use ndarray::array;

    #[test]
    fn candidates_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ns = ArtifactStore::new(dir.path()).begin_run_named("run").unwrap();
        let params: Params = [("max_depth".to_string(), 2.0), ("min_samples_split".to_string(), 2.0)]
            .into_iter()
            .collect();
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let model = build_estimator(Family::DecisionTree, &params)
            .unwrap()
            .fit(x.view(), &[false, false, true, true])
            .unwrap();
        let candidate = TrainedModel {
            run_id: RunId::new("run"),
            target: Target::Admission,
            family: Family::DecisionTree,
            params,
            cv_score: 1.0,
            model,
        };
        let output = TrainingOutput {
            admission: vec![candidate],
            scholarship: Vec::new(),
        };

        persist_candidates(&ns, &output).unwrap();
        let loaded: TrainingOutput = read_json(&ns.path(Stage::ModelTrainer, CANDIDATES_FILE)).unwrap();
        assert_eq!(loaded, output);
        assert!(loaded.admission[0].model.predict(&[2.5]));
    }
}
