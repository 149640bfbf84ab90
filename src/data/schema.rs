//! Expected columns, types and categorical domains.
//!
//! The same parser serves training and inference: [`ParseMode::Training`]
//! enforces closed domains and labels, [`ParseMode::Inference`] only checks
//! presence and type.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{AdmitError, AdmitResult};

use super::domain::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Categorical {
        /// Closed set of standardized values; `None` accepts any value.
        #[serde(default)]
        domain: Option<Vec<String>>,
    },
    Label,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    Always,
    EnglishTrack,
    ChineseTrack,
    Optional,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Training,
    Inference,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub columns: Vec<ColumnSpec>,
}

/// Trim, lowercase, and turn `-` and whitespace into `_`.
pub fn standardize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

fn numeric(name: &str, min: Option<f64>, max: Option<f64>, requirement: Requirement) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        kind: ColumnKind::Numeric { min, max },
        requirement,
    }
}

fn categorical(name: &str, domain: Option<&[&str]>, requirement: Requirement) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        kind: ColumnKind::Categorical {
            domain: domain.map(|d| d.iter().map(|s| s.to_string()).collect()),
        },
        requirement,
    }
}

fn label(name: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        kind: ColumnKind::Label,
        requirement: Requirement::Always,
    }
}

impl Default for SchemaSpec {
    fn default() -> Self {
        use Requirement::*;
        Self {
            columns: vec![
                categorical(APPLICATION_ID, None, Optional),
                categorical(
                    PROGRAM_CATEGORY,
                    Some(&["undergraduate", "postgraduate", "chinese_language", "dual_degree"]),
                    Always,
                ),
                categorical(COUNTRY, None, Always),
                categorical(PROGRAM_APPLIED, None, Always),
                categorical(DEGREE_LANGUAGE, Some(&["english_taught", "chinese_taught"]), Always),
                numeric(PREVIOUS_GPA, Some(0.0), Some(5.0), Always),
                numeric(MATH_PHYSICS, Some(0.0), Some(10.0), Always),
                numeric(RESEARCH_ALIGNMENT, Some(0.0), Some(10.0), Always),
                numeric(PUBLICATION_COUNT, Some(0.0), None, Always),
                numeric(RECOMMENDATION, Some(0.0), Some(10.0), Always),
                numeric(INTERVIEW, Some(0.0), Some(100.0), Always),
                categorical(ENGLISH_TEST_TYPE, Some(&["ielts", "toefl", "duolingo"]), EnglishTrack),
                numeric(ENGLISH_SCORE, Some(0.0), Some(160.0), EnglishTrack),
                categorical(
                    CHINESE_PROFICIENCY,
                    Some(&["hsk1", "hsk2", "hsk3", "hsk4", "hsk5", "hsk6"]),
                    ChineseTrack,
                ),
                label(ADMISSION_LABEL),
                label(SCHOLARSHIP_LABEL),
            ],
        }
    }
}

impl SchemaSpec {
    pub fn from_yaml_file(path: &Path) -> AdmitResult<Self> {
        let raw = fs::read_to_string(path)?;
        serde_yaml::from_str(&raw)
            .map_err(|e| AdmitError::config(format!("invalid schema {}: {e}", path.display())))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the numeric columns, in schema order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Numeric { .. }))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Names of the categorical feature columns, ids excluded.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Categorical { .. }))
            .filter(|c| c.requirement != Requirement::Optional)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Columns a training frame cannot do without, labels included.
    pub fn required_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.requirement == Requirement::Always)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Header check: every always-required column must be present.
    pub fn check_header(&self, frame: &Frame, mode: ParseMode) -> AdmitResult<()> {
        for col in &self.columns {
            if col.requirement != Requirement::Always {
                continue;
            }
            if mode == ParseMode::Inference && col.kind == ColumnKind::Label {
                continue;
            }
            if !frame.has_column(&col.name) {
                return Err(AdmitError::schema(&col.name, None, "required column is missing"));
            }
        }
        Ok(())
    }

    /// Parse one record, rejecting it on the first problem.
    pub fn parse_record(
        &self,
        cells: &dyn Cells,
        row: Option<usize>,
        mode: ParseMode,
    ) -> AdmitResult<ApplicantRecord> {
        let p = FieldParser {
            schema: self,
            cells,
            row,
            mode,
        };
        let degree_language = p.categorical(DEGREE_LANGUAGE)?;
        let language = match degree_language.as_str() {
            "english_taught" => LanguageTrack::EnglishTaught {
                english_test_type: p.categorical(ENGLISH_TEST_TYPE)?,
                english_score: p.number(ENGLISH_SCORE)?,
            },
            "chinese_taught" => LanguageTrack::ChineseTaught {
                chinese_proficiency: p.categorical(CHINESE_PROFICIENCY)?,
            },
            other => {
                return Err(AdmitError::schema(
                    DEGREE_LANGUAGE,
                    row,
                    format!("unknown language track '{other}'"),
                ))
            }
        };
        Ok(ApplicantRecord {
            application_id: cells.cell(APPLICATION_ID).map(|s| s.trim().to_string()),
            program_category: p.categorical(PROGRAM_CATEGORY)?,
            country: p.categorical(COUNTRY)?,
            bit_program_applied: p.categorical(PROGRAM_APPLIED)?,
            previous_gpa: p.number(PREVIOUS_GPA)?,
            math_physics_background_score: p.number(MATH_PHYSICS)?,
            research_alignment_score: p.number(RESEARCH_ALIGNMENT)?,
            publication_count: p.number(PUBLICATION_COUNT)?,
            recommendation_strength: p.number(RECOMMENDATION)?,
            interview_score: p.number(INTERVIEW)?,
            language,
        })
    }

    /// Parse both labels and enforce `scholarship ⇒ admitted`.
    pub fn parse_labels(&self, cells: &dyn Cells, row: Option<usize>) -> AdmitResult<Labels> {
        let admitted = parse_flag(cells, ADMISSION_LABEL, row, &["admitted"], &["rejected"])?;
        let scholarship = parse_flag(
            cells,
            SCHOLARSHIP_LABEL,
            row,
            &["scholarship", "partial_scholarship", "full_scholarship"],
            &["no_scholarship"],
        )?;
        let labels = Labels {
            admitted,
            scholarship,
        };
        if !labels.is_consistent() {
            return Err(AdmitError::schema(
                SCHOLARSHIP_LABEL,
                row,
                "scholarship granted to a rejected applicant",
            ));
        }
        Ok(labels)
    }

    /// Header check plus full parse of every row.
    pub fn parse_frame(&self, frame: &Frame) -> AdmitResult<Dataset> {
        self.check_header(frame, ParseMode::Training)?;
        let mut records = Vec::with_capacity(frame.len());
        let mut labels = Vec::with_capacity(frame.len());
        for i in 0..frame.len() {
            let row = frame.row(i);
            records.push(self.parse_record(&row, Some(i), ParseMode::Training)?);
            labels.push(self.parse_labels(&row, Some(i))?);
        }
        Ok(Dataset::new(records, labels))
    }
}

fn parse_flag(
    cells: &dyn Cells,
    column: &str,
    row: Option<usize>,
    yes: &[&str],
    no: &[&str],
) -> AdmitResult<bool> {
    let raw = cells
        .cell(column)
        .ok_or_else(|| AdmitError::schema(column, row, "label is missing"))?;
    let value = standardize(raw);
    if yes.contains(&value.as_str()) || matches!(value.as_str(), "true" | "1" | "yes") {
        Ok(true)
    } else if no.contains(&value.as_str()) || matches!(value.as_str(), "false" | "0" | "no") {
        Ok(false)
    } else {
        Err(AdmitError::schema(column, row, format!("unknown label '{raw}'")))
    }
}

struct FieldParser<'a> {
    schema: &'a SchemaSpec,
    cells: &'a dyn Cells,
    row: Option<usize>,
    mode: ParseMode,
}

impl FieldParser<'_> {
    fn raw(&self, column: &str) -> AdmitResult<&str> {
        self.cells
            .cell(column)
            .ok_or_else(|| AdmitError::schema(column, self.row, "required value is missing"))
    }

    fn number(&self, column: &str) -> AdmitResult<f64> {
        let raw = self.raw(column)?;
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| AdmitError::schema(column, self.row, format!("'{raw}' is not a number")))?;
        if !value.is_finite() {
            return Err(AdmitError::schema(column, self.row, "value is not finite"));
        }
        if self.mode == ParseMode::Training {
            if let Some(ColumnKind::Numeric { min, max }) = self.schema.column(column).map(|c| &c.kind)
            {
                if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
                    return Err(AdmitError::schema(
                        column,
                        self.row,
                        format!("{value} outside [{}, {}]", fmt_bound(*min), fmt_bound(*max)),
                    ));
                }
            }
        }
        Ok(value)
    }

    fn categorical(&self, column: &str) -> AdmitResult<String> {
        let value = standardize(self.raw(column)?);
        if self.mode == ParseMode::Training {
            if let Some(ColumnKind::Categorical { domain: Some(domain) }) =
                self.schema.column(column).map(|c| &c.kind)
            {
                if !domain.iter().any(|d| standardize(d) == value) {
                    return Err(AdmitError::schema(
                        column,
                        self.row,
                        format!("'{value}' is not in the allowed domain"),
                    ));
                }
            }
        }
        Ok(value)
    }
}

fn fmt_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |b| b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn english_row() -> BTreeMap<String, String> {
        [
            (PROGRAM_CATEGORY, "Postgraduate"),
            (COUNTRY, "Kenya"),
            (PROGRAM_APPLIED, "Physics"),
            (DEGREE_LANGUAGE, "English-taught"),
            (PREVIOUS_GPA, "3.6"),
            (MATH_PHYSICS, "7.5"),
            (RESEARCH_ALIGNMENT, "8"),
            (PUBLICATION_COUNT, "2"),
            (RECOMMENDATION, "8.1"),
            (INTERVIEW, "88"),
            (ENGLISH_TEST_TYPE, "TOEFL"),
            (ENGLISH_SCORE, "101"),
            (CHINESE_PROFICIENCY, "HSK2"),
            (ADMISSION_LABEL, "Admitted"),
            (SCHOLARSHIP_LABEL, "Partial Scholarship"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn parses_english_track_and_ignores_chinese_fields() {
        let schema = SchemaSpec::default();
        let row = english_row();
        let record = schema.parse_record(&row, Some(0), ParseMode::Training).unwrap();
        assert_eq!(record.program_category, "postgraduate");
        assert_eq!(
            record.language,
            LanguageTrack::EnglishTaught {
                english_test_type: "toefl".into(),
                english_score: 101.0
            }
        );
        let labels = schema.parse_labels(&row, Some(0)).unwrap();
        assert_eq!(labels, Labels { admitted: true, scholarship: true });
    }

    #[test]
    fn chinese_track_does_not_need_english_fields() {
        let schema = SchemaSpec::default();
        let mut row = english_row();
        row.insert(DEGREE_LANGUAGE.into(), "Chinese-taught".into());
        row.remove(ENGLISH_TEST_TYPE);
        row.insert(ENGLISH_SCORE.into(), "na".into());
        row.insert(CHINESE_PROFICIENCY.into(), "HSK5".into());
        let record = schema.parse_record(&row, Some(0), ParseMode::Training).unwrap();
        assert_eq!(
            record.language,
            LanguageTrack::ChineseTaught { chinese_proficiency: "hsk5".into() }
        );
    }

    #[test]
    fn violations_name_the_column() {
        let schema = SchemaSpec::default();
        let mut row = english_row();
        row.insert(INTERVIEW.into(), "eighty".into());
        match schema.parse_record(&row, Some(4), ParseMode::Training) {
            Err(AdmitError::SchemaViolation { column, row, .. }) => {
                assert_eq!(column, INTERVIEW);
                assert_eq!(row, Some(4));
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut row = english_row();
        row.insert(ENGLISH_TEST_TYPE.into(), "cambridge".into());
        let err = schema.parse_record(&row, Some(1), ParseMode::Training).unwrap_err();
        assert!(matches!(err, AdmitError::SchemaViolation { ref column, .. } if column == ENGLISH_TEST_TYPE));
        // closed domains are a training-time gate only
        assert!(schema.parse_record(&row, None, ParseMode::Inference).is_ok());
    }

    #[test]
    fn scholarship_without_admission_is_rejected() {
        let schema = SchemaSpec::default();
        let mut row = english_row();
        row.insert(ADMISSION_LABEL.into(), "Rejected".into());
        let err = schema.parse_labels(&row, Some(2)).unwrap_err();
        assert!(matches!(err, AdmitError::SchemaViolation { ref column, .. } if column == SCHOLARSHIP_LABEL));
    }

    #[test]
    fn header_check_reports_missing_column() {
        let schema = SchemaSpec::default();
        let frame = Frame::new(vec![COUNTRY.to_string()], vec![]);
        let err = schema.check_header(&frame, ParseMode::Training).unwrap_err();
        assert!(matches!(err, AdmitError::SchemaViolation { row: None, .. }));
    }

    #[test]
    fn schema_round_trips_through_yaml() {
        let schema = SchemaSpec::default();
        let yaml = serde_yaml::to_string(&schema).unwrap();
        let back: SchemaSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, schema);
    }
}
