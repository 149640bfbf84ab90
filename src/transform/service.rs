//! Fit and apply the feature transformer.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1};

use crate::artifact::repo_fs::{write_json, write_matrix};
use crate::artifact::{RunNamespace, Stage};
use crate::common::error::AdmitResult;
use crate::data::domain::{ADMISSION_LABEL, SCHOLARSHIP_LABEL};
use crate::data::ApplicantRecord;

use super::domain::{NumericStats, TransformerState, Vocabulary};
use super::features::{numeric_inputs, CATEGORICAL_FEATURES, NUMERIC_FEATURES};

pub const STATE_FILE: &str = "transformer/state.json";
pub const TRAIN_MATRIX_FILE: &str = "transformed/train.csv";
pub const TEST_MATRIX_FILE: &str = "transformed/test.csv";

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn numeric_stats(name: &str, observed: Vec<Option<f64>>) -> NumericStats {
    let mut present: Vec<f64> = observed.iter().flatten().copied().collect();
    let median = median(&mut present);
    let imputed: Vec<f64> = observed.iter().map(|v| v.unwrap_or(median)).collect();
    let n = imputed.len().max(1) as f64;
    let mean = imputed.iter().sum::<f64>() / n;
    let var = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    NumericStats {
        name: name.to_string(),
        median,
        mean,
        std: if std > f64::EPSILON { std } else { 1.0 },
    }
}

fn vocabulary(name: &str, records: &[ApplicantRecord]) -> Vocabulary {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in records.iter().filter_map(|r| r.categorical(name)) {
        *counts.entry(value).or_default() += 1;
    }
    // first maximum in sorted order
    let mode = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, (v, c)| match best {
            Some((_, bc)) if bc >= *c => best,
            _ => Some((*v, *c)),
        })
        .map(|(v, _)| v.to_string())
        .unwrap_or_default();
    Vocabulary {
        name: name.to_string(),
        categories: counts.keys().map(|k| k.to_string()).collect(),
        mode,
    }
}

/// Learn imputation, scaling and vocabularies from the training records.
pub fn fit(records: &[ApplicantRecord]) -> TransformerState {
    let inputs: Vec<[Option<f64>; 10]> = records.iter().map(numeric_inputs).collect();
    let numeric = NUMERIC_FEATURES
        .iter()
        .enumerate()
        .map(|(j, name)| numeric_stats(name, inputs.iter().map(|row| row[j]).collect()))
        .collect();
    let categorical = CATEGORICAL_FEATURES
        .iter()
        .map(|name| vocabulary(name, records))
        .collect();
    TransformerState {
        numeric,
        categorical,
        fitted_rows: records.len(),
    }
}

/// Transform one record; the length is always `state.width()`.
pub fn apply(state: &TransformerState, record: &ApplicantRecord) -> Vec<f64> {
    let mut out = Vec::with_capacity(state.width());
    let inputs = numeric_inputs(record);
    for (stats, raw) in state.numeric.iter().zip(inputs) {
        let value = raw.filter(|v| v.is_finite()).unwrap_or(stats.median);
        out.push((value - stats.mean) / stats.std);
    }
    for vocab in &state.categorical {
        let value = record.categorical(&vocab.name).unwrap_or(vocab.mode.as_str());
        let slot = vocab.slot(value);
        out.extend((0..vocab.width()).map(|i| if i == slot { 1.0 } else { 0.0 }));
    }
    out
}

/// Row-wise [`apply`] into a matrix.
pub fn apply_batch(state: &TransformerState, records: &[ApplicantRecord]) -> Array2<f64> {
    let mut matrix = Array2::zeros((records.len(), state.width()));
    for (i, record) in records.iter().enumerate() {
        let row = apply(state, record);
        matrix.row_mut(i).assign(&ArrayView1::from(&row[..]));
    }
    matrix
}

/// Persist the fitted state and both transformed partitions.
pub fn persist(
    ns: &RunNamespace,
    state: &TransformerState,
    train: (&Array2<f64>, &[bool], &[bool]),
    test: (&Array2<f64>, &[bool], &[bool]),
) -> AdmitResult<()> {
    write_json(&ns.path(Stage::DataTransformation, STATE_FILE), state)?;
    let names = state.feature_names();
    for (rel, (x, admitted, scholarship)) in [(TRAIN_MATRIX_FILE, train), (TEST_MATRIX_FILE, test)] {
        write_matrix(
            &ns.path(Stage::DataTransformation, rel),
            &names,
            x,
            &[
                (ADMISSION_LABEL, admitted.to_vec()),
                (SCHOLARSHIP_LABEL, scholarship.to_vec()),
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LanguageTrack;

    fn record(country: &str, gpa: f64, track: LanguageTrack) -> ApplicantRecord {
        ApplicantRecord {
            application_id: None,
            program_category: "undergraduate".into(),
            country: country.into(),
            bit_program_applied: "physics".into(),
            previous_gpa: gpa,
            math_physics_background_score: 6.0,
            research_alignment_score: 4.0,
            publication_count: 1.0,
            recommendation_strength: 7.0,
            interview_score: 70.0,
            language: track,
        }
    }

    fn english(score: f64) -> LanguageTrack {
        LanguageTrack::EnglishTaught {
            english_test_type: "toefl".into(),
            english_score: score,
        }
    }

    fn chinese() -> LanguageTrack {
        LanguageTrack::ChineseTaught {
            chinese_proficiency: "hsk4".into(),
        }
    }

    #[test]
    fn missing_track_fields_impute_to_median() {
        let train = vec![
            record("kenya", 3.0, english(80.0)),
            record("kenya", 3.5, english(100.0)),
            record("chad", 4.0, chinese()),
        ];
        let state = fit(&train);
        let english_stats = &state.numeric[6];
        assert_eq!(english_stats.name, "english_score");
        assert_eq!(english_stats.median, 90.0);
        assert_eq!(state.categorical[1].mode, "kenya");
        assert_eq!(state.categorical[4].mode, "toefl");

        let row = apply(&state, &train[2]);
        assert_eq!(row.len(), state.width());
        assert!(row.iter().all(|v| v.is_finite()));
        // english_score of a chinese-track applicant sits at the median
        let expected = (90.0 - english_stats.mean) / english_stats.std;
        assert!((row[6] - expected).abs() < 1e-12);
    }

    #[test]
    fn unseen_category_uses_unknown_slot() {
        let state = fit(&[record("kenya", 3.0, english(95.0)), record("chad", 3.2, chinese())]);
        let row = apply(&state, &record("peru", 3.1, english(91.0)));
        assert_eq!(row.len(), state.width());
        let names = state.feature_names();
        let unknown = names.iter().position(|n| n == "country=__unknown__").unwrap();
        assert_eq!(row[unknown], 1.0);
    }

    #[test]
    fn batch_matches_single_rows() {
        let train = vec![
            record("kenya", 3.0, english(95.0)),
            record("chad", 3.9, chinese()),
            record("peru", 2.1, english(70.0)),
        ];
        let state = fit(&train);
        let batch = apply_batch(&state, &train);
        for (i, r) in train.iter().enumerate() {
            assert_eq!(batch.row(i).to_vec(), apply(&state, r));
        }
    }
}
