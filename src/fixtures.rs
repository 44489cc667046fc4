use crate::models::{Dataset, RawRow, StudentRecord};
use crate::normalize::normalize;

pub fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn student(id: &str, college: &str, year: &str, ai: &str, flag: &str) -> StudentRecord {
    normalize(row(&[
        ("Student_ID", id),
        ("College", college),
        ("Year_Level", year),
        ("Prior_GWA", "1.75"),
        ("AI_Dependency_Index", ai),
        ("Reading_Dependency_Score", "3"),
        ("Writing_Dependency_Score", "4"),
        ("Numeracy_Dependency_Score", "2"),
        ("Motivation_Score", "5"),
        ("Environment_Score", "3"),
        ("High_Risk_Flag", flag),
        ("Final_Grade", "85"),
    ]))
}

pub fn roster() -> Dataset {
    Dataset::new(vec![
        student("S-001", "College of Teacher Education", "1", "6.5", "0"),
        student(
            "S-002",
            "College of Arts and Sciences",
            "First Year",
            "3.0",
            "0",
        ),
        student("S-003", "College of Engineering", "3rd", "5.5", "1"),
        student("S-004", "College of Arts and Sciences", "", "4.0", "0"),
        student("S-005", "College of Nursing", "2", "2.0", "0"),
        student("S-006", "College of Engineering", "4", "7.0", "0"),
    ])
}
