use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

mod aggregate;
mod charts;
mod config;
mod error;
mod export;
#[cfg(test)]
mod fixtures;
mod layout;
mod logging;
mod models;
mod normalize;
mod recommend;
mod report;
mod risk;
mod session;
mod source;

use aggregate::{aggregate, GroupBy, Measure};
use config::Config;
use error::DashboardError;
use layout::PageGeometry;
use logging::{setup_logging, TracingFormat};
use models::{NumericField, RiskLabel};
use report::{ReportFormat, ReportOptions};
use risk::{Classifier, HttpPredictor, VerdictSource};
use session::DashboardSession;
use source::DatasetSource;

/// Intrinsic size of a rendered chart image, in page units.
const CHART_WIDTH: f64 = 240.0;
const CHART_HEIGHT: f64 = 120.0;

#[derive(Parser)]
#[command(name = "intelligrade")]
#[command(about = "AI dependency risk dashboard for student rosters", long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = TracingFormat::Pretty)]
    tracing: TracingFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Grouping {
    College,
    CollegeName,
    Year,
    Risk,
}

#[derive(Subcommand)]
enum Commands {
    /// Print grouped averages across the roster
    Summary {
        #[arg(long, value_enum, default_value_t = Grouping::College)]
        by: Grouping,
    },
    /// Show one student's risk badge and recommendations
    #[command(group(
        ArgGroup::new("selection")
            .args(["id", "first"])
            .multiple(false)
    ))]
    Student {
        #[arg(long)]
        id: Option<String>,
        /// Select the first record in the dataset
        #[arg(long)]
        first: bool,
    },
    /// Emit chart series as JSON
    Charts {
        #[arg(long)]
        id: Option<String>,
    },
    /// Write a single-student report
    Report {
        #[arg(long)]
        id: Option<String>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Write the roster-wide summary report
    SummaryReport {
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Group the college table by name as entered instead of abbreviation
        #[arg(long)]
        by_name: bool,
    },
    /// Export every record as CSV
    Export {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Reload the dataset on an interval
    Watch {
        /// Seconds between reloads; overrides the configured interval
        #[arg(long)]
        interval: Option<u64>,
    },
}

struct Dashboard {
    config: Config,
    source: DatasetSource,
    classifier: Classifier,
    session: DashboardSession,
}

impl Dashboard {
    fn new(config: Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build http client")?;

        let source =
            DatasetSource::new(client.clone(), config.api_base.clone(), &config.data_csv);

        let mut classifier = Classifier::new(config.risk_threshold);
        if let Some(base) = &config.predictor_base {
            let predictor = Arc::new(HttpPredictor::new(client, base.clone()));
            classifier = classifier.with_predictor(predictor, config.predictor_timeout());
        }

        Ok(Self {
            config,
            source,
            classifier,
            session: DashboardSession::new(),
        })
    }

    fn report_options(&self, college_grouping: GroupBy) -> ReportOptions {
        ReportOptions {
            generated_at: Utc::now(),
            threshold: self.config.risk_threshold,
            rules: self.config.recommendation_rules(),
            include_charts: self.config.include_charts,
            college_grouping,
            geometry: PageGeometry::default(),
        }
    }

    fn notify_refresh(&self) {
        let dataset = self.session.dataset();
        if self.config.enable_notifications {
            info!(
                records = dataset.len(),
                origin = %self.session.origin(),
                "dashboard refreshed"
            );
        }
        if self.config.notify_high_risk {
            for record in dataset.records() {
                if self.classifier.baseline(record) == RiskLabel::High {
                    warn!(
                        student_id = %record.student_id,
                        college = %normalize::normalize_college(&record.college),
                        ai_index = record.ai_dependency_index,
                        "high-risk student"
                    );
                }
            }
        }
    }
}

fn print_buckets(grouping: Grouping, dashboard: &Dashboard) {
    let threshold = dashboard.config.risk_threshold;
    let group_by = match grouping {
        Grouping::College => GroupBy::College,
        Grouping::CollegeName => GroupBy::CollegeName,
        Grouping::Year => GroupBy::YearLevel,
        Grouping::Risk => GroupBy::Risk { threshold },
    };
    let ai = Measure::Field(NumericField::AiDependencyIndex);
    let grade = Measure::Field(NumericField::FinalGrade);
    let high = Measure::HighRisk { threshold };

    let dataset = dashboard.session.dataset();
    let stats = aggregate::overall_stats(&dataset, threshold);
    println!("Total responses: {}", stats.total);
    match stats.avg_prior_gwa {
        Some(avg) => println!("Average grade: {avg:.2}"),
        None => println!("Average grade: N/A"),
    }
    println!("{} breakdown:", group_by.label());
    for bucket in aggregate(&dataset, group_by, &[ai, grade, high]) {
        println!(
            "- {}: {} students, avg AI index {:.2}, avg grade {:.2}, {} high risk",
            bucket.key,
            bucket.count,
            bucket.mean(ai.name()),
            bucket.mean(grade.name()),
            bucket.sum(high.name()) as usize
        );
    }
}

fn output_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(filename)
}

/// Reloads every `period` until `shutdown` resolves. A reload in flight is
/// abandoned on shutdown.
async fn watch<F: Future>(dashboard: &mut Dashboard, period: Duration, shutdown: F) {
    tokio::pin!(shutdown);

    dashboard.notify_refresh();
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    info!(
        period_secs = period.as_secs(),
        "watching for dataset changes"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let applied = tokio::select! {
            applied = dashboard.session.reload(&dashboard.source) => applied,
            _ = &mut shutdown => break,
        };
        if applied {
            dashboard.notify_refresh();
        }
    }

    info!("stopping watch");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    setup_logging(&config, cli.tracing);

    let mut dashboard = Dashboard::new(config)?;
    dashboard.session.reload(&dashboard.source).await;

    match cli.command {
        Commands::Summary { by } => {
            dashboard.session.ensure_data()?;
            print_buckets(by, &dashboard);
        }
        Commands::Student { id, first } => {
            dashboard.session.ensure_data()?;
            let dataset = dashboard.session.dataset();
            let id = if first {
                dataset.first().map(|r| r.student_id.clone())
            } else {
                id
            };
            let record = dashboard.session.select(id.as_deref())?;
            let verdict = dashboard.classifier.classify(&record).await;

            println!(
                "{} ({}, {})",
                record.student_id,
                normalize::normalize_college(&record.college),
                normalize::normalize_year_level(Some(&record.year_level))
            );
            println!("AI dependency index: {:.2}", record.ai_dependency_index);
            println!(
                "Risk: {} (threshold {:.2}){}",
                verdict.label,
                dashboard.classifier.threshold(),
                match verdict.source {
                    VerdictSource::Predictor => " (predicted)",
                    VerdictSource::Baseline => "",
                }
            );
            println!("Recommendations:");
            let advisories = recommend::recommend(&record, dashboard.config.recommendation_rules());
            for (idx, advisory) in advisories.iter().enumerate() {
                println!("{}. {}", idx + 1, advisory);
            }
        }
        Commands::Charts { id } => {
            let dataset = dashboard.session.dataset();
            let selected = match id {
                Some(id) => Some(dashboard.session.select(Some(&id))?),
                None => None,
            };
            let set = charts::chart_set(
                &dataset,
                selected.as_ref(),
                dashboard.config.risk_threshold,
                dashboard.config.theme,
                dashboard.config.chart_animation,
            );
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        Commands::Report { id, format, out } => {
            dashboard.session.ensure_data()?;
            let record = dashboard.session.select(id.as_deref())?;
            let dataset = dashboard.session.dataset();
            let verdict = dashboard.classifier.classify(&record).await;
            let set = charts::chart_set(
                &dataset,
                Some(&record),
                dashboard.config.risk_threshold,
                dashboard.config.theme,
                dashboard.config.chart_animation,
            );
            let snapshots = charts::snapshot_all(&set.charts, CHART_WIDTH, CHART_HEIGHT);
            let options = dashboard.report_options(GroupBy::College);

            let report =
                report::student_report(&dataset, &record, verdict.label, &options, &snapshots);
            let path = report::write_report(&report, format, &out)?;
            println!("Report written to {}.", path.display());
        }
        Commands::SummaryReport {
            format,
            out,
            by_name,
        } => {
            let dataset = dashboard.session.dataset();
            let set = charts::chart_set(
                &dataset,
                None,
                dashboard.config.risk_threshold,
                dashboard.config.theme,
                dashboard.config.chart_animation,
            );
            let snapshots = charts::snapshot_all(&set.charts, CHART_WIDTH, CHART_HEIGHT);
            let grouping = if by_name {
                GroupBy::CollegeName
            } else {
                GroupBy::College
            };
            let options = dashboard.report_options(grouping);

            let report = report::summary_report(&dataset, &options, &snapshots)?;
            let path = report::write_report(&report, format, &out)?;
            println!("Summary report written to {}.", path.display());
        }
        Commands::Export { out } => {
            let dataset = dashboard.session.dataset();
            dashboard.session.ensure_data()?;
            let path = output_path(&out, &export::export_filename(Utc::now()));
            let file = std::fs::File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let written = export::write_csv(&dataset, file)?;
            println!("Exported {written} records to {}.", path.display());
        }
        Commands::Watch { interval } => {
            anyhow::ensure!(
                dashboard.config.auto_refresh || interval.is_some(),
                "auto_refresh is disabled; enable it in the config or pass --interval"
            );
            let period = interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| dashboard.config.refresh_interval());

            watch(&mut dashboard, period, tokio::signal::ctrl_c()).await;
        }
    }

    if dashboard.session.dataset().is_empty() {
        warn!("{}", DashboardError::DataUnavailable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_stops_while_a_reload_is_hanging() {
        // Accepted by the kernel backlog but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = Config {
            api_base: Some(format!("http://{}", listener.local_addr().unwrap())),
            http_timeout_seconds: 60,
            enable_notifications: false,
            notify_high_risk: false,
            ..Config::default()
        };
        let mut dashboard = Dashboard::new(config).unwrap();

        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        let stopped = tokio::time::timeout(
            Duration::from_secs(5),
            watch(&mut dashboard, Duration::from_millis(20), shutdown),
        )
        .await;

        assert!(stopped.is_ok());
        assert!(dashboard.session.dataset().is_empty());
        drop(listener);
    }
}
