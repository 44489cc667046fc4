use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{aggregate, risk_counts, GroupBy, Measure};
use crate::config::Theme;
use crate::models::{Dataset, NumericField, StudentRecord};

const AI_INDEX: Measure = Measure::Field(NumericField::AiDependencyIndex);
const SCORE_AXIS_MAX: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    DomainBar,
    CollegeLine,
    RiskPie,
    YearLevelLine,
}

impl ChartKind {
    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::DomainBar => "Dependency Domains Chart",
            ChartKind::CollegeLine => "Student Distribution by College",
            ChartKind::RiskPie => "Risk Distribution",
            ChartKind::YearLevelLine => "AI Dependency by Year Level",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub y_max: Option<f64>,
}

pub fn domain_chart(record: &StudentRecord) -> ChartSeries {
    ChartSeries {
        kind: ChartKind::DomainBar,
        label: "Dependency Score".to_string(),
        labels: vec!["Reading".into(), "Writing".into(), "Numeracy".into()],
        values: vec![
            record.reading_dependency_score,
            record.writing_dependency_score,
            record.numeracy_dependency_score,
        ],
        y_max: Some(SCORE_AXIS_MAX),
    }
}

pub fn college_chart(dataset: &Dataset) -> ChartSeries {
    let buckets = aggregate(dataset, GroupBy::College, &[AI_INDEX]);
    ChartSeries {
        kind: ChartKind::CollegeLine,
        label: "Average AI Dependency Score".to_string(),
        values: buckets.iter().map(|b| b.mean(AI_INDEX.name())).collect(),
        labels: buckets.into_iter().map(|b| b.key).collect(),
        y_max: None,
    }
}

pub fn year_level_chart(dataset: &Dataset) -> ChartSeries {
    let buckets = aggregate(dataset, GroupBy::YearLevel, &[AI_INDEX]);
    let (labels, values) = if buckets.is_empty() {
        (vec!["No Data".to_string()], vec![0.0])
    } else {
        (
            buckets.iter().map(|b| b.key.clone()).collect(),
            buckets.iter().map(|b| b.mean(AI_INDEX.name())).collect(),
        )
    };
    ChartSeries {
        kind: ChartKind::YearLevelLine,
        label: "Average AI Dependency Score".to_string(),
        labels,
        values,
        y_max: Some(SCORE_AXIS_MAX),
    }
}

pub fn risk_chart(dataset: &Dataset, threshold: f64) -> ChartSeries {
    let counts = risk_counts(dataset, threshold);
    ChartSeries {
        kind: ChartKind::RiskPie,
        label: "Students".to_string(),
        labels: vec!["High Risk".into(), "Low Risk".into()],
        values: vec![counts.high as f64, counts.low as f64],
        y_max: None,
    }
}

/// A rendered chart as the report sees it: a series plus the intrinsic size
/// of the image it was drawn into, in page units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub series: ChartSeries,
    pub width: f64,
    pub height: f64,
}

impl ChartSnapshot {
    pub fn new(series: ChartSeries, width: f64, height: f64) -> Self {
        Self {
            series,
            width,
            height,
        }
    }
}

/// Rendered chart images available to a report, by chart.
pub type ChartSnapshots = HashMap<ChartKind, ChartSnapshot>;

/// Draws every series at the same intrinsic size.
pub fn snapshot_all(charts: &[ChartSeries], width: f64, height: f64) -> ChartSnapshots {
    charts
        .iter()
        .map(|series| {
            let snapshot = ChartSnapshot::new(series.clone(), width, height);
            (series.kind, snapshot)
        })
        .collect()
}

/// Everything a dashboard needs to draw its four charts.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSet {
    pub theme: Theme,
    pub animation: bool,
    pub charts: Vec<ChartSeries>,
}

pub fn chart_set(
    dataset: &Dataset,
    selected: Option<&StudentRecord>,
    threshold: f64,
    theme: Theme,
    animation: bool,
) -> ChartSet {
    let mut charts = Vec::with_capacity(4);
    if let Some(record) = selected {
        charts.push(domain_chart(record));
    }
    charts.push(college_chart(dataset));
    charts.push(risk_chart(dataset, threshold));
    charts.push(year_level_chart(dataset));
    ChartSet {
        theme,
        animation,
        charts,
    }
}
