//! Engineered inputs derived from one applicant record.

use crate::data::domain::*;

/// Numeric model inputs, in matrix column order.
pub const NUMERIC_FEATURES: [&str; 10] = [
    PREVIOUS_GPA,
    MATH_PHYSICS,
    RESEARCH_ALIGNMENT,
    "log_publication_count",
    RECOMMENDATION,
    INTERVIEW,
    ENGLISH_SCORE,
    "chinese_level",
    "language_requirement_passed",
    "weighted_score",
];

/// Categorical model inputs, one-hot encoded after the numeric block.
pub const CATEGORICAL_FEATURES: [&str; 5] = [
    PROGRAM_CATEGORY,
    COUNTRY,
    PROGRAM_APPLIED,
    DEGREE_LANGUAGE,
    ENGLISH_TEST_TYPE,
];

/// Digits of an HSK spelling such as `hsk5` or `HSK-4`.
pub fn hsk_level(proficiency: &str) -> Option<f64> {
    let digits: String = proficiency.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Whether the applicant clears the language bar of their track.
pub fn language_requirement_passed(track: &LanguageTrack) -> bool {
    match track {
        LanguageTrack::EnglishTaught {
            english_test_type,
            english_score,
        } => match english_test_type.as_str() {
            "toefl" | "duolingo" => *english_score >= 90.0,
            "ielts" => *english_score >= 6.5,
            _ => false,
        },
        LanguageTrack::ChineseTaught {
            chinese_proficiency,
        } => hsk_level(chinese_proficiency).is_some_and(|l| l >= 4.0),
    }
}

/// Program-specific blend of the academic scores.
pub fn weighted_score(r: &ApplicantRecord) -> f64 {
    match r.program_category.as_str() {
        "undergraduate" => {
            0.4 * r.previous_gpa
                + 0.3 * r.math_physics_background_score
                + 0.1 * r.recommendation_strength
                + 0.2 * r.interview_score
        }
        "postgraduate" => {
            0.4 * r.previous_gpa
                + 0.3 * r.research_alignment_score
                + 0.1 * r.publication_count.min(5.0)
                + 0.1 * r.recommendation_strength
                + 0.1 * r.interview_score
        }
        _ => 0.5 * r.previous_gpa + 0.2 * r.recommendation_strength + 0.3 * r.interview_score,
    }
}

/// Axes of [`radar_profile`], in order.
pub const RADAR_AXES: [&str; 7] = [
    PREVIOUS_GPA,
    MATH_PHYSICS,
    RESEARCH_ALIGNMENT,
    PUBLICATION_COUNT,
    RECOMMENDATION,
    INTERVIEW,
    "language_requirement_passed",
];

/// Scores scaled to `[0, 1]` for the applicant profile chart.
pub fn radar_profile(r: &ApplicantRecord) -> [f64; 7] {
    let scaled = |value: f64, full: f64| (value / full).clamp(0.0, 1.0);
    [
        scaled(r.previous_gpa, 4.0),
        scaled(r.math_physics_background_score, 10.0),
        scaled(r.research_alignment_score, 10.0),
        scaled(r.publication_count, 5.0),
        scaled(r.recommendation_strength, 10.0),
        scaled(r.interview_score, 100.0),
        if language_requirement_passed(&r.language) { 1.0 } else { 0.0 },
    ]
}

/// Raw numeric inputs aligned with [`NUMERIC_FEATURES`]; `None` means impute.
pub fn numeric_inputs(r: &ApplicantRecord) -> [Option<f64>; 10] {
    let chinese_level = match &r.language {
        LanguageTrack::ChineseTaught {
            chinese_proficiency,
        } => hsk_level(chinese_proficiency),
        LanguageTrack::EnglishTaught { .. } => None,
    };
    [
        Some(r.previous_gpa),
        Some(r.math_physics_background_score),
        Some(r.research_alignment_score),
        Some(r.publication_count.max(0.0).ln_1p()),
        Some(r.recommendation_strength),
        Some(r.interview_score),
        r.numeric(ENGLISH_SCORE),
        chinese_level,
        Some(f64::from(u8::from(language_requirement_passed(&r.language)))),
        Some(weighted_score(r)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_bars_per_test() {
        let english = |t: &str, s: f64| LanguageTrack::EnglishTaught {
            english_test_type: t.into(),
            english_score: s,
        };
        assert!(language_requirement_passed(&english("toefl", 90.0)));
        assert!(!language_requirement_passed(&english("duolingo", 85.0)));
        assert!(language_requirement_passed(&english("ielts", 6.5)));
        assert!(!language_requirement_passed(&english("cambridge", 200.0)));
        let chinese = LanguageTrack::ChineseTaught {
            chinese_proficiency: "hsk3".into(),
        };
        assert!(!language_requirement_passed(&chinese));
        assert_eq!(hsk_level("HSK-6"), Some(6.0));
        assert_eq!(hsk_level("fluent"), None);
    }

    #[test]
    fn radar_profile_is_scaled_and_capped() {
        let record = ApplicantRecord {
            application_id: None,
            program_category: "postgraduate".into(),
            country: "kenya".into(),
            bit_program_applied: "physics".into(),
            previous_gpa: 3.0,
            math_physics_background_score: 12.0,
            research_alignment_score: 5.0,
            publication_count: 9.0,
            recommendation_strength: 7.5,
            interview_score: 80.0,
            language: LanguageTrack::ChineseTaught {
                chinese_proficiency: "hsk5".into(),
            },
        };
        assert_eq!(radar_profile(&record), [0.75, 1.0, 0.5, 1.0, 0.75, 0.8, 1.0]);
        assert_eq!(RADAR_AXES.len(), radar_profile(&record).len());

        let english = ApplicantRecord {
            language: LanguageTrack::EnglishTaught {
                english_test_type: "ielts".into(),
                english_score: 5.0,
            },
            ..record
        };
        assert_eq!(radar_profile(&english)[6], 0.0);
    }
}
