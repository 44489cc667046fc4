use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{breakdown, overall_stats, BreakdownRow, GroupBy};
use crate::charts::{ChartKind, ChartSnapshots};
use crate::error::DashboardError;
use crate::layout::{
    paginate, wrap_text, Block, Fragment, Metric, PageGeometry, PagedDocument, Table,
};
use crate::models::{Dataset, RiskLabel, StudentRecord, YEAR_LEVEL};
use crate::normalize::{normalize_college, normalize_year_level};
use crate::recommend::{recommend, RecommendationRules};

const STUDENT_TITLE: &str = "IntelliGrade Report";
const SUMMARY_TITLE: &str = "IntelliGrade Summary Report";
const INSTITUTION: &str = "Laguna State Polytechnic University - San Pablo City Campus";
const FOOTER: &str = "IntelliGrade • All Rights Reserved • DevCo-BLV (2025)";
const BREAKDOWN_COLUMNS: [&str; 4] = ["Students", "Avg AI Index", "Avg Grade", "High Risk"];
const MAX_LABEL_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// Settings shared by both report kinds.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub generated_at: DateTime<Utc>,
    pub threshold: f64,
    pub rules: RecommendationRules,
    pub include_charts: bool,
    pub college_grouping: GroupBy,
    pub geometry: PageGeometry,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub subtitle: String,
    pub footer: String,
    pub filename_stem: String,
    pub document: PagedDocument,
}

fn fmt2(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}%"))
}

fn raw_or_na(record: &StudentRecord, column: &str) -> String {
    match record.raw_value(column).map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "N/A".to_string(),
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 3).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

/// File-name-safe form of a student ID.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn push_chart(
    blocks: &mut Vec<Block>,
    options: &ReportOptions,
    charts: &ChartSnapshots,
    kind: ChartKind,
) {
    if !options.include_charts {
        return;
    }
    match charts.get(&kind) {
        Some(snapshot) => {
            blocks.push(Block::Heading(kind.title().to_string()));
            blocks.push(Block::Chart(snapshot.clone()));
            blocks.push(Block::Spacer(8.0));
        }
        None => warn!(chart = ?kind, "chart snapshot missing, skipping section"),
    }
}

fn breakdown_table(first_column: &str, rows: &[BreakdownRow]) -> Table {
    let mut columns = vec![first_column.to_string()];
    columns.extend(BREAKDOWN_COLUMNS.iter().map(|c| c.to_string()));

    Table {
        columns,
        rows: rows
            .iter()
            .map(|row| {
                vec![
                    truncate_label(&row.key),
                    row.students.to_string(),
                    format!("{:.2}", row.avg_ai_index),
                    format!("{:.2}", row.avg_final_grade),
                    format!("{} ({:.1}%)", row.high_risk, row.high_risk_pct),
                ]
            })
            .collect(),
    }
}

pub fn student_report(
    dataset: &Dataset,
    record: &StudentRecord,
    risk: RiskLabel,
    options: &ReportOptions,
    charts: &ChartSnapshots,
) -> Report {
    let stats = overall_stats(dataset, options.threshold);
    let mut blocks = vec![
        Block::Heading("Student Information".into()),
        Block::Text(format!("Student ID: {}", record.student_id)),
        Block::Text(format!(
            "College: {} ({})",
            record.college,
            normalize_college(&record.college)
        )),
        Block::Text(format!(
            "Year Level: {} ({})",
            raw_or_na(record, YEAR_LEVEL),
            normalize_year_level(Some(&record.year_level))
        )),
        Block::Text(format!(
            "Report Generated: {}",
            options.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        Block::Spacer(6.0),
        Block::Heading("Key Metrics".into()),
        Block::Metrics(vec![
            Metric::new(
                "AI Dependency Index",
                raw_or_na(record, "AI_Dependency_Index"),
            ),
            Metric::new("Predicted Risk", risk.as_str()),
            Metric::new("Performance Level", raw_or_na(record, "Final_Grade")),
            Metric::new("Motivation Score", raw_or_na(record, "Motivation_Score")),
        ]),
        Block::Spacer(10.0),
        Block::Heading("Dependency Domain Scores".into()),
        Block::Text(format!(
            "Reading: {}",
            raw_or_na(record, "Reading_Dependency_Score")
        )),
        Block::Text(format!(
            "Writing: {}",
            raw_or_na(record, "Writing_Dependency_Score")
        )),
        Block::Text(format!(
            "Numeracy: {}",
            raw_or_na(record, "Numeracy_Dependency_Score")
        )),
        Block::Spacer(6.0),
    ];

    push_chart(&mut blocks, options, charts, ChartKind::DomainBar);

    blocks.push(Block::Heading("Recommendations".into()));
    let width = options.geometry.line_chars();
    for (idx, advisory) in recommend(record, options.rules).iter().enumerate() {
        // Printed reports stay within plain ASCII.
        let advisory = advisory.replace('\u{2014}', "-");
        for line in wrap_text(&format!("{}. {}", idx + 1, advisory), width) {
            blocks.push(Block::Text(line));
        }
    }
    blocks.push(Block::Spacer(6.0));

    blocks.push(Block::Heading("College-Wide Analysis".into()));
    blocks.push(Block::Text(format!(
        "Total Students Analyzed: {}",
        stats.total
    )));
    blocks.push(Block::Text(format!(
        "Average Grade (All Students): {}",
        fmt2(stats.avg_prior_gwa)
    )));
    blocks.push(Block::Spacer(6.0));
    push_chart(&mut blocks, options, charts, ChartKind::CollegeLine);

    Report {
        title: STUDENT_TITLE.to_string(),
        subtitle: INSTITUTION.to_string(),
        footer: FOOTER.to_string(),
        filename_stem: format!(
            "IntelliGrade_Report_{}_{}",
            sanitize(&record.student_id),
            options.generated_at.timestamp_millis()
        ),
        document: paginate(blocks, options.geometry),
    }
}

pub fn summary_report(
    dataset: &Dataset,
    options: &ReportOptions,
    charts: &ChartSnapshots,
) -> Result<Report, DashboardError> {
    if dataset.is_empty() {
        return Err(DashboardError::DataUnavailable);
    }

    let stats = overall_stats(dataset, options.threshold);
    let colleges = breakdown(dataset, options.college_grouping, options.threshold);
    let years = breakdown(dataset, GroupBy::YearLevel, options.threshold);

    let mut blocks = vec![
        Block::Heading("Overall Statistics".into()),
        Block::Text(format!("Total Students Analyzed: {}", stats.total)),
        Block::Text(format!(
            "Average Grade (All Students): {}",
            fmt2(stats.avg_prior_gwa)
        )),
        Block::Text(format!(
            "Average AI Dependency Index: {}",
            fmt2(stats.avg_ai_index)
        )),
        Block::Text(format!(
            "Report Generated: {}",
            options.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        Block::Spacer(6.0),
        Block::Heading("Risk Distribution".into()),
        Block::Text(format!(
            "High Risk: {} students ({})",
            stats.risk.high,
            fmt_pct(stats.risk.percent(RiskLabel::High))
        )),
        Block::Text(format!(
            "Low Risk: {} students ({})",
            stats.risk.low,
            fmt_pct(stats.risk.percent(RiskLabel::Low))
        )),
        Block::Spacer(6.0),
        Block::Heading("Average Dependency Domain Scores".into()),
        Block::Text(format!("Reading: {}", fmt2(stats.avg_reading))),
        Block::Text(format!("Writing: {}", fmt2(stats.avg_writing))),
        Block::Text(format!("Numeracy: {}", fmt2(stats.avg_numeracy))),
        Block::Spacer(6.0),
        Block::Heading("College-wise Breakdown".into()),
        Block::Table(breakdown_table(options.college_grouping.label(), &colleges)),
        Block::Spacer(8.0),
        Block::Heading("Year Level Breakdown".into()),
        Block::Table(breakdown_table(GroupBy::YearLevel.label(), &years)),
        Block::Spacer(10.0),
    ];

    for kind in [ChartKind::CollegeLine, ChartKind::RiskPie, ChartKind::YearLevelLine] {
        push_chart(&mut blocks, options, charts, kind);
    }

    Ok(Report {
        title: SUMMARY_TITLE.to_string(),
        subtitle: INSTITUTION.to_string(),
        footer: FOOTER.to_string(),
        filename_stem: format!(
            "IntelliGrade_Summary_Report_{}",
            options.generated_at.timestamp_millis()
        ),
        document: paginate(blocks, options.geometry),
    })
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", report.title);
    let _ = writeln!(output, "{}", report.subtitle);

    for page in 0..report.document.page_count {
        let _ = writeln!(output);
        let _ = writeln!(output, "<!-- page {} -->", page + 1);

        for placement in report.document.page(page) {
            match &placement.fragment {
                Fragment::Heading { text } => {
                    let _ = writeln!(output);
                    let _ = writeln!(output, "## {text}");
                }
                Fragment::Text { text } => {
                    let _ = writeln!(output, "{text}  ");
                }
                Fragment::Metrics { metrics } => {
                    let _ = writeln!(output, "| Metric | Value |");
                    let _ = writeln!(output, "|---|---|");
                    for metric in metrics {
                        let _ = writeln!(output, "| {} | {} |", metric.label, metric.value);
                    }
                }
                Fragment::TableHeader { cells } => {
                    let _ = writeln!(output);
                    let _ = writeln!(output, "{}", table_row(cells));
                    let _ = writeln!(output, "|{}", "---|".repeat(cells.len()));
                }
                Fragment::TableRow { cells } => {
                    let _ = writeln!(output, "{}", table_row(cells));
                }
                Fragment::Chart { chart, width, height } => {
                    let _ = writeln!(
                        output,
                        "_{} ({width:.0} x {height:.0} mm)_",
                        chart.series.label
                    );
                    for (label, value) in chart.series.labels.iter().zip(&chart.series.values) {
                        let _ = writeln!(output, "- {label}: {value:.2}");
                    }
                }
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "_{} • page {} of {}_",
            report.footer,
            page + 1,
            report.document.page_count
        );
    }

    output
}

pub fn render(report: &Report, format: ReportFormat) -> Result<String, DashboardError> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).map_err(DashboardError::report_failed)
        }
    }
}

/// Renders and saves a report into `dir`, returning the written path.
pub fn write_report(
    report: &Report,
    format: ReportFormat,
    dir: &Path,
) -> Result<PathBuf, DashboardError> {
    let body = render(report, format)?;
    let path = dir.join(format!("{}.{}", report.filename_stem, format.extension()));
    std::fs::write(&path, body).map_err(DashboardError::report_failed)?;
    info!(
        path = %path.display(),
        pages = report.document.page_count,
        "report written"
    );
    Ok(path)
}
