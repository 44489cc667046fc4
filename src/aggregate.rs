use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{AggregationBucket, Dataset, NumericField, RiskLabel, StudentRecord};
use crate::normalize::{
    normalize_college, normalize_year_level, COLLEGE_ORDER, UNKNOWN, YEAR_LEVEL_ORDER,
};
use crate::risk;

const RISK_ORDER: [&str; 2] = ["HIGH", "LOW"];

/// Grouping key derived from a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupBy {
    /// Normalized college abbreviation.
    College,
    /// College name exactly as entered, for open-ended listings.
    CollegeName,
    YearLevel,
    Risk { threshold: f64 },
}

impl GroupBy {
    pub fn key(&self, record: &StudentRecord) -> String {
        match self {
            GroupBy::College => normalize_college(&record.college),
            GroupBy::CollegeName => {
                if record.college.trim().is_empty() {
                    UNKNOWN.to_string()
                } else {
                    record.college.clone()
                }
            }
            GroupBy::YearLevel => normalize_year_level(Some(&record.year_level)),
            GroupBy::Risk { threshold } => risk::classify(record, *threshold).as_str().to_string(),
        }
    }

    pub fn canonical_order(&self) -> &'static [&'static str] {
        match self {
            GroupBy::College => &COLLEGE_ORDER,
            GroupBy::CollegeName => &[],
            GroupBy::YearLevel => &YEAR_LEVEL_ORDER,
            GroupBy::Risk { .. } => &RISK_ORDER,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupBy::College | GroupBy::CollegeName => "College",
            GroupBy::YearLevel => "Year Level",
            GroupBy::Risk { .. } => "Risk",
        }
    }
}

/// A per-record quantity summed into each bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Field(NumericField),
    /// 1 for records classified HIGH at `threshold`, else 0.
    HighRisk { threshold: f64 },
}

impl Measure {
    pub fn name(&self) -> &'static str {
        match self {
            Measure::Field(field) => field.column(),
            Measure::HighRisk { .. } => "High_Risk",
        }
    }

    fn value(&self, record: &StudentRecord) -> f64 {
        match self {
            Measure::Field(field) => record.value(*field),
            Measure::HighRisk { threshold } => match risk::classify(record, *threshold) {
                RiskLabel::High => 1.0,
                RiskLabel::Low => 0.0,
            },
        }
    }
}

/// Groups `dataset` by `key_fn`, summing each measure per group.
///
/// Keys listed in `canonical` come first in that order; any other keys follow
/// in ascending lexicographic order. Groups with no records are never emitted.
pub fn aggregate_by<F>(
    dataset: &Dataset,
    key_fn: F,
    canonical: &[&str],
    measures: &[Measure],
) -> Vec<AggregationBucket>
where
    F: Fn(&StudentRecord) -> String,
{
    let mut groups: HashMap<String, (usize, BTreeMap<&'static str, f64>)> = HashMap::new();

    for record in dataset.records() {
        let entry = groups.entry(key_fn(record)).or_insert_with(|| {
            let sums = measures.iter().map(|m| (m.name(), 0.0)).collect();
            (0, sums)
        });
        entry.0 += 1;
        for measure in measures {
            *entry.1.entry(measure.name()).or_insert(0.0) += measure.value(record);
        }
    }

    let mut buckets = Vec::with_capacity(groups.len());
    for key in canonical {
        if let Some((count, sums)) = groups.remove(*key) {
            buckets.push(AggregationBucket {
                key: (*key).to_string(),
                count,
                sums,
            });
        }
    }

    let mut rest: Vec<AggregationBucket> = groups
        .into_iter()
        .map(|(key, (count, sums))| AggregationBucket {
            key,
            count,
            sums,
        })
        .collect();
    rest.sort_by(|a, b| a.key.cmp(&b.key));
    buckets.extend(rest);

    buckets.retain(|b| b.count > 0);
    buckets
}

pub fn aggregate(
    dataset: &Dataset,
    group_by: GroupBy,
    measures: &[Measure],
) -> Vec<AggregationBucket> {
    let canonical = group_by.canonical_order();
    aggregate_by(dataset, |r| group_by.key(r), canonical, measures)
}

/// Mean of a field over the whole dataset; `None` when there is no data.
pub fn overall_mean(dataset: &Dataset, field: NumericField) -> Option<f64> {
    if dataset.is_empty() {
        return None;
    }
    let total: f64 = dataset.records().iter().map(|r| r.value(field)).sum();
    Some(total / dataset.len() as f64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub high: usize,
    pub low: usize,
}

impl RiskCounts {
    pub fn total(&self) -> usize {
        self.high + self.low
    }

    pub fn percent(&self, label: RiskLabel) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let n = match label {
            RiskLabel::High => self.high,
            RiskLabel::Low => self.low,
        };
        Some(n as f64 * 100.0 / total as f64)
    }
}

pub fn risk_counts(dataset: &Dataset, threshold: f64) -> RiskCounts {
    let buckets = aggregate(dataset, GroupBy::Risk { threshold }, &[]);
    let count_of = |key: &str| buckets.iter().find(|b| b.key == key).map_or(0, |b| b.count);
    RiskCounts {
        high: count_of(RiskLabel::High.as_str()),
        low: count_of(RiskLabel::Low.as_str()),
    }
}

/// Headline numbers for the whole roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub total: usize,
    pub avg_prior_gwa: Option<f64>,
    pub avg_ai_index: Option<f64>,
    pub avg_reading: Option<f64>,
    pub avg_writing: Option<f64>,
    pub avg_numeracy: Option<f64>,
    pub risk: RiskCounts,
}

pub fn overall_stats(dataset: &Dataset, threshold: f64) -> OverallStats {
    OverallStats {
        total: dataset.len(),
        avg_prior_gwa: overall_mean(dataset, NumericField::PriorGwa),
        avg_ai_index: overall_mean(dataset, NumericField::AiDependencyIndex),
        avg_reading: overall_mean(dataset, NumericField::ReadingDependencyScore),
        avg_writing: overall_mean(dataset, NumericField::WritingDependencyScore),
        avg_numeracy: overall_mean(dataset, NumericField::NumeracyDependencyScore),
        risk: risk_counts(dataset, threshold),
    }
}

/// One line of a college or year-level breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub key: String,
    pub students: usize,
    pub avg_ai_index: f64,
    pub avg_final_grade: f64,
    pub high_risk: usize,
    pub high_risk_pct: f64,
}

pub fn breakdown(dataset: &Dataset, group_by: GroupBy, threshold: f64) -> Vec<BreakdownRow> {
    let high = Measure::HighRisk { threshold };
    let ai = Measure::Field(NumericField::AiDependencyIndex);
    let grade = Measure::Field(NumericField::FinalGrade);

    aggregate(dataset, group_by, &[ai, grade, high])
        .into_iter()
        .map(|bucket| {
            let high_risk = bucket.sum(high.name()) as usize;
            BreakdownRow {
                avg_ai_index: bucket.mean(ai.name()),
                avg_final_grade: bucket.mean(grade.name()),
                high_risk,
                high_risk_pct: high_risk as f64 * 100.0 / bucket.count as f64,
                students: bucket.count,
                key: bucket.key,
            }
        })
        .collect()
}
