//! Core dataset definitions: the raw frame, typed applicant records and labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const APPLICATION_ID: &str = "application_id";
pub const PROGRAM_CATEGORY: &str = "program_category";
pub const COUNTRY: &str = "country";
pub const PROGRAM_APPLIED: &str = "bit_program_applied";
pub const DEGREE_LANGUAGE: &str = "degree_language";
pub const PREVIOUS_GPA: &str = "previous_gpa";
pub const MATH_PHYSICS: &str = "math_physics_background_score";
pub const RESEARCH_ALIGNMENT: &str = "research_alignment_score";
pub const PUBLICATION_COUNT: &str = "publication_count";
pub const RECOMMENDATION: &str = "recommendation_strength";
pub const INTERVIEW: &str = "interview_score";
pub const ENGLISH_TEST_TYPE: &str = "english_test_type";
pub const ENGLISH_SCORE: &str = "english_score";
pub const CHINESE_PROFICIENCY: &str = "chinese_proficiency";
pub const ADMISSION_LABEL: &str = "admission_decision";
pub const SCHOLARSHIP_LABEL: &str = "scholarship_tier";

/// Column order used when a dataset is written back to a frame.
pub const FRAME_COLUMNS: [&str; 16] = [
    APPLICATION_ID,
    PROGRAM_CATEGORY,
    COUNTRY,
    PROGRAM_APPLIED,
    DEGREE_LANGUAGE,
    PREVIOUS_GPA,
    MATH_PHYSICS,
    RESEARCH_ALIGNMENT,
    PUBLICATION_COUNT,
    RECOMMENDATION,
    INTERVIEW,
    ENGLISH_TEST_TYPE,
    ENGLISH_SCORE,
    CHINESE_PROFICIENCY,
    ADMISSION_LABEL,
    SCHOLARSHIP_LABEL,
];

/// Uniform tabular structure returned by every data source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Cell spellings that mean "no value".
pub fn is_missing(cell: &str) -> bool {
    let t = cell.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("na")
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("null")
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row(&self, index: usize) -> FrameRow<'_> {
        FrameRow { frame: self, index }
    }

    /// Build a frame from JSON documents; columns follow first appearance.
    ///
    /// Document ids (`_id`) are dropped and `null` becomes a missing cell.
    pub fn from_documents(docs: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for doc in docs {
            for key in doc.keys() {
                if key != "_id" && !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = docs
            .iter()
            .map(|doc| {
                columns
                    .iter()
                    .map(|c| doc.get(c).map(json_cell).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

/// Render a scalar JSON value as a frame cell.
pub fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Named cell access shared by frame rows and request payloads.
pub trait Cells {
    /// Raw cell for `column`, `None` when absent or missing.
    fn cell(&self, column: &str) -> Option<&str>;
}

/// Borrowed view of one frame row.
#[derive(Copy, Clone)]
pub struct FrameRow<'a> {
    frame: &'a Frame,
    index: usize,
}

impl Cells for FrameRow<'_> {
    fn cell(&self, column: &str) -> Option<&str> {
        let col = self.frame.column_index(column)?;
        let value = self.frame.rows.get(self.index)?.get(col)?;
        (!is_missing(value)).then_some(value.as_str())
    }
}

impl Cells for BTreeMap<String, String> {
    fn cell(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(String::as_str)
            .filter(|v| !is_missing(v))
    }
}

/// Language track selected by `degree_language`; the field sets are exclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "degree_language", rename_all = "snake_case")]
pub enum LanguageTrack {
    EnglishTaught {
        english_test_type: String,
        english_score: f64,
    },
    ChineseTaught {
        chinese_proficiency: String,
    },
}

impl LanguageTrack {
    pub fn degree_language(&self) -> &'static str {
        match self {
            LanguageTrack::EnglishTaught { .. } => "english_taught",
            LanguageTrack::ChineseTaught { .. } => "chinese_taught",
        }
    }
}

/// One applicant; categorical values are stored standardized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    pub program_category: String,
    pub country: String,
    pub bit_program_applied: String,
    pub previous_gpa: f64,
    pub math_physics_background_score: f64,
    pub research_alignment_score: f64,
    pub publication_count: f64,
    pub recommendation_strength: f64,
    pub interview_score: f64,
    #[serde(flatten)]
    pub language: LanguageTrack,
}

impl ApplicantRecord {
    /// Raw numeric field by column name; `None` for the other track's fields.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            PREVIOUS_GPA => Some(self.previous_gpa),
            MATH_PHYSICS => Some(self.math_physics_background_score),
            RESEARCH_ALIGNMENT => Some(self.research_alignment_score),
            PUBLICATION_COUNT => Some(self.publication_count),
            RECOMMENDATION => Some(self.recommendation_strength),
            INTERVIEW => Some(self.interview_score),
            ENGLISH_SCORE => match &self.language {
                LanguageTrack::EnglishTaught { english_score, .. } => Some(*english_score),
                LanguageTrack::ChineseTaught { .. } => None,
            },
            _ => None,
        }
    }

    /// Categorical field by column name.
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            PROGRAM_CATEGORY => Some(self.program_category.as_str()),
            COUNTRY => Some(self.country.as_str()),
            PROGRAM_APPLIED => Some(self.bit_program_applied.as_str()),
            DEGREE_LANGUAGE => Some(self.language.degree_language()),
            ENGLISH_TEST_TYPE => match &self.language {
                LanguageTrack::EnglishTaught { english_test_type, .. } => Some(english_test_type.as_str()),
                LanguageTrack::ChineseTaught { .. } => None,
            },
            CHINESE_PROFICIENCY => match &self.language {
                LanguageTrack::ChineseTaught { chinese_proficiency } => Some(chinese_proficiency.as_str()),
                LanguageTrack::EnglishTaught { .. } => None,
            },
            _ => None,
        }
    }
}

/// Outcome labels of one applicant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub admitted: bool,
    pub scholarship: bool,
}

impl Labels {
    /// Scholarship is only defined for admitted applicants.
    pub fn is_consistent(&self) -> bool {
        self.admitted || !self.scholarship
    }

    /// Stratum used by the train/holdout split.
    pub fn class_index(&self) -> usize {
        match (self.admitted, self.scholarship) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => 2,
        }
    }
}

/// Validated records with their labels, in ingestion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<ApplicantRecord>,
    pub labels: Vec<Labels>,
}

impl Dataset {
    pub fn new(records: Vec<ApplicantRecord>, labels: Vec<Labels>) -> Self {
        debug_assert_eq!(records.len(), labels.len());
        Self { records, labels }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn admission_labels(&self) -> Vec<bool> {
        self.labels.iter().map(|l| l.admitted).collect()
    }

    pub fn scholarship_labels(&self) -> Vec<bool> {
        self.labels.iter().map(|l| l.scholarship).collect()
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Only the admitted applicants.
    pub fn admitted(&self) -> Dataset {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| self.labels[i].admitted).collect();
        self.subset(&idx)
    }

    /// Render back to the raw tabular form using [`FRAME_COLUMNS`].
    pub fn to_frame(&self) -> Frame {
        let columns = FRAME_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = self
            .records
            .iter()
            .zip(&self.labels)
            .map(|(r, l)| record_cells(r, l))
            .collect();
        Frame { columns, rows }
    }
}

fn record_cells(r: &ApplicantRecord, l: &Labels) -> Vec<String> {
    let (test_type, score, proficiency) = match &r.language {
        LanguageTrack::EnglishTaught {
            english_test_type,
            english_score,
        } => (english_test_type.clone(), english_score.to_string(), String::new()),
        LanguageTrack::ChineseTaught {
            chinese_proficiency,
        } => (String::new(), String::new(), chinese_proficiency.clone()),
    };
    vec![
        r.application_id.clone().unwrap_or_default(),
        r.program_category.clone(),
        r.country.clone(),
        r.bit_program_applied.clone(),
        r.language.degree_language().to_string(),
        r.previous_gpa.to_string(),
        r.math_physics_background_score.to_string(),
        r.research_alignment_score.to_string(),
        r.publication_count.to_string(),
        r.recommendation_strength.to_string(),
        r.interview_score.to_string(),
        test_type,
        score,
        proficiency,
        if l.admitted { "admitted" } else { "rejected" }.to_string(),
        if l.scholarship { "scholarship" } else { "no_scholarship" }.to_string(),
    ]
}
