#![allow(dead_code)]

use std::fs;
use std::path::Path;

use admit_core::common::config::AppCfg;
use admit_core::data::domain::FRAME_COLUMNS;
use serde_json::{json, Value};
use tempfile::TempDir;

const COUNTRIES: [&str; 4] = ["Kenya", "Brazil", "Vietnam", "Pakistan"];
const PROGRAMS: [&str; 2] = ["Physics", "Computer Science"];
const CATEGORIES: [&str; 2] = ["Postgraduate", "Undergraduate"];

/// One deterministic applicant row in `FRAME_COLUMNS` order.
///
/// Rows with `i % 5 < 2` are admitted (40 of 100) and rows with `i % 10 == 0`
/// also hold a scholarship (10 of 100).
pub fn applicant_row(i: usize) -> Vec<String> {
    let admitted = i % 5 < 2;
    let scholarship = i % 10 == 0;
    let jitter = (i % 7) as f64;
    let gpa = match (admitted, scholarship) {
        (true, true) => 4.4 + jitter * 0.05,
        (true, false) => 3.5 + jitter * 0.05,
        _ => 2.2 + jitter * 0.1,
    };
    let interview = if admitted { 78.0 + jitter * 2.0 } else { 45.0 + jitter * 3.0 };
    let research = (if scholarship { 9.0 } else if admitted { 7.0 } else { 4.0 }) + jitter * 0.1;
    let chinese = i % 3 == 0;
    let (language, test_type, score, hsk) = if chinese {
        ("Chinese-taught", "", String::new(), if i % 2 == 0 { "HSK5" } else { "HSK4" })
    } else if i % 2 == 0 {
        ("English-taught", "IELTS", format!("{:.1}", 6.0 + jitter * 0.25), "")
    } else {
        ("English-taught", "TOEFL", format!("{}", 85 + i % 20), "")
    };

    vec![
        format!("app-{i:03}"),
        CATEGORIES[i % 2].to_string(),
        COUNTRIES[i % 4].to_string(),
        PROGRAMS[(i / 2) % 2].to_string(),
        language.to_string(),
        format!("{gpa:.2}"),
        format!("{:.1}", (if admitted { 7.5 } else { 5.0 }) + jitter * 0.2),
        format!("{research:.1}"),
        format!("{}", if admitted { 1 + i % 3 } else { i % 2 }),
        format!("{:.1}", (if admitted { 8.0 } else { 5.5 }) + jitter * 0.1),
        format!("{interview:.1}"),
        test_type.to_string(),
        score,
        hsk.to_string(),
        if admitted { "Admitted" } else { "Rejected" }.to_string(),
        if scholarship { "Full Scholarship" } else { "No Scholarship" }.to_string(),
    ]
}

pub fn write_snapshot(dir: &Path, name: &str, rows: usize) {
    fs::create_dir_all(dir).unwrap();
    let mut writer = csv::Writer::from_path(dir.join(name)).unwrap();
    writer.write_record(FRAME_COLUMNS).unwrap();
    for i in 0..rows {
        writer.write_record(applicant_row(i)).unwrap();
    }
    writer.flush().unwrap();
}

/// Temp workspace with a dated 100-row snapshot and a local-only config.
pub struct Workspace {
    pub dir: TempDir,
    pub cfg: AppCfg,
}

pub fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = dir.path().join("original_dataset");
    write_snapshot(&snapshots, "admissions_2025-06-01.csv", 100);
    let cfg = AppCfg::local(dir.path().join("artifact"), snapshots);
    Workspace { dir, cfg }
}

pub fn english_applicant() -> Value {
    json!({
        "program_category": "postgraduate",
        "country": "Kenya",
        "bit_program_applied": "Physics",
        "degree_language": "english_taught",
        "previous_gpa": 3.8,
        "math_physics_background_score": 8.0,
        "research_alignment_score": 7.5,
        "publication_count": 2,
        "recommendation_strength": 8.2,
        "interview_score": 85,
        "english_test_type": "toefl",
        "english_score": 100
    })
}

pub fn chinese_applicant() -> Value {
    json!({
        "program_category": "undergraduate",
        "country": "Atlantis",
        "bit_program_applied": "Physics",
        "degree_language": "chinese_taught",
        "previous_gpa": 2.4,
        "math_physics_background_score": 5.0,
        "research_alignment_score": 4.0,
        "publication_count": 0,
        "recommendation_strength": 5.0,
        "interview_score": 50,
        "chinese_proficiency": "HSK4"
    })
}
