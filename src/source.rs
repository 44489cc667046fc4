use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::export::read_csv;
use crate::models::{Dataset, RawRow};
use crate::normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Api,
    Csv,
    Unavailable,
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataOrigin::Api => "api",
            DataOrigin::Csv => "csv",
            DataOrigin::Unavailable => "unavailable",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub dataset: Dataset,
    pub origin: DataOrigin,
}

/// Where the roster comes from: the students endpoint when configured, then
/// a static CSV file. Never fails; total failure yields an empty dataset.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    client: Client,
    api_base: Option<String>,
    csv_path: PathBuf,
}

impl DatasetSource {
    pub fn new(client: Client, api_base: Option<String>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            api_base,
            csv_path: csv_path.into(),
        }
    }

    pub async fn load(&self) -> LoadOutcome {
        if let Some(base) = &self.api_base {
            match self.fetch_api(base).await {
                Ok(rows) => return outcome(rows, DataOrigin::Api),
                Err(err) => warn!(
                    error = %format!("{err:#}"),
                    "students endpoint failed, falling back to csv"
                ),
            }
        }

        match read_csv_file(&self.csv_path) {
            Ok(rows) => outcome(rows, DataOrigin::Csv),
            Err(err) => {
                error!(error = %format!("{err:#}"), "no dataset source available");
                LoadOutcome {
                    dataset: Dataset::default(),
                    origin: DataOrigin::Unavailable,
                }
            }
        }
    }

    async fn fetch_api(&self, base: &str) -> anyhow::Result<Vec<RawRow>> {
        let url = format!("{}/students", base.trim_end_matches('/'));
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()?
            .text()
            .await?;
        rows_from_json(&body)
    }
}

fn outcome(rows: Vec<RawRow>, origin: DataOrigin) -> LoadOutcome {
    let dataset = build_dataset(rows);
    info!(records = dataset.len(), origin = %origin, "dataset loaded");
    LoadOutcome { dataset, origin }
}

fn read_csv_file(path: &Path) -> anyhow::Result<Vec<RawRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv(file).with_context(|| format!("failed to parse {}", path.display()))
}

/// Decodes a JSON array of row objects. Scalars become their text form and
/// `null` leaves the field absent.
pub fn rows_from_json(body: &str) -> anyhow::Result<Vec<RawRow>> {
    let objects: Vec<IndexMap<String, Value>> =
        serde_json::from_str(body).context("students payload is not an array of objects")?;

    Ok(objects
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .filter_map(|(key, value)| {
                    let text = match value {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Some((key, text))
                })
                .collect()
        })
        .collect())
}

/// Normalizes rows, keeping the first record for any repeated student ID.
pub fn build_dataset(rows: Vec<RawRow>) -> Dataset {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());
    let mut duplicates = 0usize;

    for row in rows {
        let record = normalize(row);
        if seen.insert(record.student_id.clone()) {
            records.push(record);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "dropped rows with repeated student IDs");
    }
    Dataset::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_scalars_become_strings() {
        let rows = rows_from_json(
            r#"[{"Student_ID": 17, "College": "College of Engineering", "High_Risk_Flag": true, "Year_Level": null}]"#,
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Student_ID", "College", "High_Risk_Flag"]);
        assert_eq!(rows[0]["Student_ID"], "17");
        assert_eq!(rows[0]["High_Risk_Flag"], "true");
    }

    #[test]
    fn rejects_non_array_payloads() {
        assert!(rows_from_json(r#"{"students": []}"#).is_err());
        assert!(rows_from_json("not json").is_err());
    }

    #[test]
    fn duplicate_ids_keep_first_row() {
        let rows = rows_from_json(
            r#"[{"Student_ID": "A", "College": "first"}, {"Student_ID": "A", "College": "second"}, {"Student_ID": "B"}]"#,
        )
        .unwrap();
        let dataset = build_dataset(rows);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.find("A").unwrap().college, "first");
    }

    #[tokio::test]
    async fn falls_back_to_csv_without_api() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Student_ID,College,AI_Dependency_Index\nS-1,College of Engineering,6.2\nS-2,College of Teacher Education,3.1\n"
        )
        .unwrap();

        let source = DatasetSource::new(Client::new(), None, file.path());
        let loaded = source.load().await;
        assert_eq!(loaded.origin, DataOrigin::Csv);
        assert_eq!(loaded.dataset.len(), 2);
        assert_eq!(loaded.dataset.find("S-1").unwrap().ai_dependency_index, 6.2);
    }

    #[tokio::test]
    async fn unreachable_api_falls_back_to_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Student_ID\nS-1\n").unwrap();

        // Port 9 on localhost is the discard service and is closed on test hosts.
        let api = Some("http://127.0.0.1:9".to_string());
        let source = DatasetSource::new(Client::new(), api, file.path());
        let loaded = source.load().await;
        assert_eq!(loaded.origin, DataOrigin::Csv);
        assert_eq!(loaded.dataset.len(), 1);
    }

    #[tokio::test]
    async fn total_failure_yields_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::new(Client::new(), None, dir.path().join("missing.csv"));
        let loaded = source.load().await;
        assert_eq!(loaded.origin, DataOrigin::Unavailable);
        assert!(loaded.dataset.is_empty());
    }
}
