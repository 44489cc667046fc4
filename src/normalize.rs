use crate::models::{NumericField, RawRow, StudentRecord, COLLEGE, STUDENT_ID, YEAR_LEVEL};

/// College abbreviations in display order.
pub const COLLEGE_ORDER: [&str; 8] = ["CAS", "CBAA", "CCS", "CCJE", "COE", "CIT", "CHMT", "CTE"];

/// Year levels in display order.
pub const YEAR_LEVEL_ORDER: [&str; 5] = ["1st Year", "2nd Year", "3rd Year", "4th Year", "Unknown"];

pub const UNKNOWN: &str = "Unknown";

const COLLEGE_NAMES: [(&str, &str); 8] = [
    ("College of Arts and Sciences", "CAS"),
    ("College of Business Administration and Accountancy", "CBAA"),
    ("College of Computer Studies", "CCS"),
    ("College of Criminal Justice Education", "CCJE"),
    ("College of Engineering", "COE"),
    ("College of Industrial Technology", "CIT"),
    ("College of Hospitality Management and Tourism", "CHMT"),
    ("College of Teacher Education", "CTE"),
];

/// Reads the leading number of a source value, so `"85%"` is 85. Absent,
/// empty, unparseable and non-finite values all become `0.0`.
pub fn number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| leading_float(v.trim()))
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn leading_float(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let digits_from = |mut at: usize| {
        while bytes.get(at).is_some_and(u8::is_ascii_digit) {
            at += 1;
        }
        at
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if digits > 0 || frac_end > end + 1 {
            digits += frac_end - (end + 1);
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    text[..end].parse().ok()
}

pub fn normalize_year_level(year: Option<&str>) -> String {
    let trimmed = year.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return UNKNOWN.to_string();
    }

    match trimmed {
        "1" => return "1st Year".to_string(),
        "2" => return "2nd Year".to_string(),
        "3" => return "3rd Year".to_string(),
        "4" => return "4th Year".to_string(),
        _ => {}
    }

    let lower = trimmed.to_lowercase();
    let patterns = [
        (["1st", "first"], "1st Year"),
        (["2nd", "second"], "2nd Year"),
        (["3rd", "third"], "3rd Year"),
        (["4th", "fourth"], "4th Year"),
    ];
    for (needles, canonical) in patterns {
        if needles.iter().any(|n| lower.contains(n)) {
            return canonical.to_string();
        }
    }

    trimmed.to_string()
}

/// Best-effort mapping of a free-text college name to an abbreviation.
///
/// Three tiers: exact full name, ordered keyword rules (first match wins),
/// then an abbreviation derived from the words themselves. Names outside
/// the eight known colleges may land on a known abbreviation by keyword
/// overlap; callers must treat the result as a heuristic.
pub fn normalize_college(name: &str) -> String {
    let abbrev = college_abbreviation(name);
    if abbrev == "IT" {
        "CIT".to_string()
    } else {
        abbrev
    }
}

fn college_abbreviation(name: &str) -> String {
    if name.trim().is_empty() {
        return UNKNOWN.to_string();
    }

    if let Some((_, abbrev)) = COLLEGE_NAMES.iter().find(|(full, _)| *full == name) {
        return (*abbrev).to_string();
    }

    if let Some(abbrev) = keyword_match(&name.to_lowercase()) {
        return abbrev.to_string();
    }

    derived_abbreviation(name)
}

fn keyword_match(lower: &str) -> Option<&'static str> {
    let has = |needle: &str| lower.contains(needle);

    // Order matters: "technology" also appears in computer and teacher names.
    if has("arts") && has("sciences") {
        Some("CAS")
    } else if has("business") || has("accountancy") {
        Some("CBAA")
    } else if has("computer studies") {
        Some("CCS")
    } else if has("criminal justice") {
        Some("CCJE")
    } else if has("engineering") {
        Some("COE")
    } else if has("information technology")
        || has("industrial technology")
        || (has("technology") && !has("computer") && !has("teacher"))
    {
        Some("CIT")
    } else if has("hospitality") || has("tourism") {
        Some("CHMT")
    } else if has("teacher education") {
        Some("CTE")
    } else {
        None
    }
}

fn derived_abbreviation(name: &str) -> String {
    let stripped = name.strip_prefix("College of ").unwrap_or(name);
    let words: Vec<&str> = stripped.split_whitespace().collect();

    match words.as_slice() {
        [] => UNKNOWN.to_string(),
        [word] => {
            let lower = word.to_lowercase();
            if lower == "it" || lower.contains("technology") {
                "CIT".to_string()
            } else {
                word.chars().take(4).collect()
            }
        }
        _ => {
            let initials: String = words.iter().filter_map(|w| w.chars().next()).collect();
            if initials.starts_with("CIT") || initials == "IT" {
                "CIT".to_string()
            } else {
                initials.chars().take(3).collect()
            }
        }
    }
}

/// Builds a record from a source row. Never fails.
pub fn normalize(raw: RawRow) -> StudentRecord {
    let get = |field: NumericField| number(raw.get(field.column()).map(String::as_str));

    StudentRecord {
        student_id: raw.get(STUDENT_ID).cloned().unwrap_or_default(),
        college: raw.get(COLLEGE).cloned().unwrap_or_default(),
        year_level: raw.get(YEAR_LEVEL).cloned().unwrap_or_default(),
        prior_gwa: get(NumericField::PriorGwa),
        ai_dependency_index: get(NumericField::AiDependencyIndex),
        reading_dependency_score: get(NumericField::ReadingDependencyScore),
        writing_dependency_score: get(NumericField::WritingDependencyScore),
        numeracy_dependency_score: get(NumericField::NumeracyDependencyScore),
        motivation_score: get(NumericField::MotivationScore),
        environment_score: get(NumericField::EnvironmentScore),
        high_risk_flag: get(NumericField::HighRiskFlag),
        final_grade: get(NumericField::FinalGrade),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::row;
    use proptest::prelude::*;

    #[test]
    fn number_coerces_garbage_to_zero() {
        assert_eq!(number(Some("4.25")), 4.25);
        assert_eq!(number(Some(" 3 ")), 3.0);
        assert_eq!(number(Some("")), 0.0);
        assert_eq!(number(Some("n/a")), 0.0);
        assert_eq!(number(Some("NaN")), 0.0);
        assert_eq!(number(Some("inf")), 0.0);
        assert_eq!(number(Some("Infinity")), 0.0);
        assert_eq!(number(Some("1e999")), 0.0);
        assert_eq!(number(None), 0.0);
    }

    #[test]
    fn number_reads_the_leading_numeric_prefix() {
        assert_eq!(number(Some("6.5 pts")), 6.5);
        assert_eq!(number(Some("85%")), 85.0);
        assert_eq!(number(Some("3abc")), 3.0);
        assert_eq!(number(Some("-2.5e1x")), -25.0);
        assert_eq!(number(Some("1e")), 1.0);
        assert_eq!(number(Some(".5")), 0.5);
        assert_eq!(number(Some("7.")), 7.0);
        assert_eq!(number(Some("+.")), 0.0);
        assert_eq!(number(Some("pts 6.5")), 0.0);
    }

    #[test]
    fn year_levels_collapse_to_canonical_names() {
        for input in ["1", "1st", "First", "first year", " 1st yr "] {
            assert_eq!(normalize_year_level(Some(input)), "1st Year", "{input}");
        }
        assert_eq!(normalize_year_level(Some("Second Year")), "2nd Year");
        assert_eq!(normalize_year_level(Some("3")), "3rd Year");
        assert_eq!(normalize_year_level(Some("fourth")), "4th Year");
        assert_eq!(normalize_year_level(Some("")), "Unknown");
        assert_eq!(normalize_year_level(Some("   ")), "Unknown");
        assert_eq!(normalize_year_level(None), "Unknown");
        assert_eq!(normalize_year_level(Some(" Graduate ")), "Graduate");
        assert_eq!(normalize_year_level(Some("5")), "5");
    }

    #[test]
    fn exact_college_names_map_directly() {
        for (full, abbrev) in COLLEGE_NAMES {
            assert_eq!(normalize_college(full), abbrev);
        }
    }

    #[test]
    fn keyword_rules_apply_in_declared_order() {
        assert_eq!(normalize_college("Dept. of Arts & Sciences"), "CAS");
        assert_eq!(normalize_college("School of Accountancy"), "CBAA");
        assert_eq!(normalize_college("computer studies"), "CCS");
        assert_eq!(normalize_college("Institute of Criminal Justice"), "CCJE");
        assert_eq!(normalize_college("Engineering Dept"), "COE");
        assert_eq!(normalize_college("Information Technology"), "CIT");
        assert_eq!(normalize_college("College of Hospitality"), "CHMT");
        assert_eq!(normalize_college("Teacher Education"), "CTE");
    }

    // Heuristic, not a lookup: these pin order-sensitive outcomes that are
    // arguably wrong for colleges outside the known eight.
    #[test]
    fn keyword_overlaps_resolve_by_first_match() {
        // "engineering" outranks "technology".
        assert_eq!(normalize_college("Engineering Technology"), "COE");
        // "computer" blocks the bare-technology rule, so this falls through.
        assert_eq!(normalize_college("Computer Technology"), "CT");
        // Teacher + technology without "teacher education" derives initials.
        assert_eq!(normalize_college("Teacher Technology Institute"), "TTI");
        // Bare "technology" is treated as industrial technology.
        assert_eq!(normalize_college("Food Technology"), "CIT");
    }

    #[test]
    fn fallback_derives_abbreviations() {
        assert_eq!(normalize_college("College of Nursing"), "Nurs");
        assert_eq!(normalize_college("Law"), "Law");
        assert_eq!(normalize_college("IT"), "CIT");
        assert_eq!(normalize_college("it"), "CIT");
        assert_eq!(
            normalize_college("College of Medical Allied Sciences Studies"),
            "MAS"
        );
        assert_eq!(normalize_college("Institute of Tourism"), "CHMT");
        assert_eq!(normalize_college("Innovation Tech"), "CIT");
        assert_eq!(normalize_college("College Innovation Tech"), "CIT");
        assert_eq!(normalize_college(""), "Unknown");
    }

    #[test]
    fn normalize_coerces_every_numeric_field() {
        let record = normalize(row(&[
            ("Student_ID", "S-001"),
            ("College", "College of Engineering"),
            ("Year_Level", "2"),
            ("AI_Dependency_Index", "6.2"),
            ("Motivation_Score", "abc"),
            ("High_Risk_Flag", "1"),
        ]));

        assert_eq!(record.student_id, "S-001");
        assert_eq!(record.college, "College of Engineering");
        assert_eq!(record.year_level, "2");
        assert_eq!(record.ai_dependency_index, 6.2);
        assert_eq!(record.motivation_score, 0.0);
        assert_eq!(record.high_risk_flag, 1.0);
        assert_eq!(record.final_grade, 0.0);
        assert_eq!(record.raw_value("Motivation_Score"), Some("abc"));
    }

    proptest! {
        #[test]
        fn number_is_never_nan(input in ".*") {
            prop_assert!(number(Some(&input)).is_finite());
        }

        #[test]
        fn college_normalization_is_deterministic(input in ".*") {
            let first = normalize_college(&input);
            prop_assert_eq!(first.clone(), normalize_college(&input));
            prop_assert_ne!(first.as_str(), "IT");
        }

        #[test]
        fn year_normalization_never_empty(input in ".*") {
            prop_assert!(!normalize_year_level(Some(&input)).is_empty());
        }
    }
}
