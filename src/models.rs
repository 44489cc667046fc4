use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// A source row exactly as it arrived, keyed by header name in source order.
pub type RawRow = IndexMap<String, String>;

pub const STUDENT_ID: &str = "Student_ID";
pub const COLLEGE: &str = "College";
pub const YEAR_LEVEL: &str = "Year_Level";

/// Numeric columns of a respondent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NumericField {
    PriorGwa,
    AiDependencyIndex,
    ReadingDependencyScore,
    WritingDependencyScore,
    NumeracyDependencyScore,
    MotivationScore,
    EnvironmentScore,
    HighRiskFlag,
    FinalGrade,
}

impl NumericField {
    /// Column name in the dataset source.
    pub fn column(&self) -> &'static str {
        match self {
            NumericField::PriorGwa => "Prior_GWA",
            NumericField::AiDependencyIndex => "AI_Dependency_Index",
            NumericField::ReadingDependencyScore => "Reading_Dependency_Score",
            NumericField::WritingDependencyScore => "Writing_Dependency_Score",
            NumericField::NumeracyDependencyScore => "Numeracy_Dependency_Score",
            NumericField::MotivationScore => "Motivation_Score",
            NumericField::EnvironmentScore => "Environment_Score",
            NumericField::HighRiskFlag => "High_Risk_Flag",
            NumericField::FinalGrade => "Final_Grade",
        }
    }
}

/// One respondent, normalized for grouping and arithmetic.
///
/// `raw` keeps the untouched source strings so exports reproduce them exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub student_id: String,
    pub college: String,
    pub year_level: String,
    pub prior_gwa: f64,
    pub ai_dependency_index: f64,
    pub reading_dependency_score: f64,
    pub writing_dependency_score: f64,
    pub numeracy_dependency_score: f64,
    pub motivation_score: f64,
    pub environment_score: f64,
    pub high_risk_flag: f64,
    pub final_grade: f64,
    pub raw: RawRow,
}

impl StudentRecord {
    pub fn value(&self, field: NumericField) -> f64 {
        match field {
            NumericField::PriorGwa => self.prior_gwa,
            NumericField::AiDependencyIndex => self.ai_dependency_index,
            NumericField::ReadingDependencyScore => self.reading_dependency_score,
            NumericField::WritingDependencyScore => self.writing_dependency_score,
            NumericField::NumeracyDependencyScore => self.numeracy_dependency_score,
            NumericField::MotivationScore => self.motivation_score,
            NumericField::EnvironmentScore => self.environment_score,
            NumericField::HighRiskFlag => self.high_risk_flag,
            NumericField::FinalGrade => self.final_grade,
        }
    }

    /// Source string for a column, if the row carried one.
    pub fn raw_value(&self, column: &str) -> Option<&str> {
        self.raw.get(column).map(String::as_str)
    }
}

/// An ordered, immutable snapshot of records. Replaced wholesale on reload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<StudentRecord>,
}

impl Dataset {
    pub fn new(records: Vec<StudentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, student_id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.student_id == student_id)
    }

    pub fn first(&self) -> Option<&StudentRecord> {
        self.records.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLabel {
    High,
    Low,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::High => "HIGH",
            RiskLabel::Low => "LOW",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One group produced by the aggregator. Never emitted with `count == 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
    pub key: String,
    pub count: usize,
    pub sums: BTreeMap<&'static str, f64>,
}

impl AggregationBucket {
    pub fn sum(&self, measure: &str) -> f64 {
        self.sums.get(measure).copied().unwrap_or(0.0)
    }

    pub fn mean(&self, measure: &str) -> f64 {
        self.sum(measure) / self.count as f64
    }
}
