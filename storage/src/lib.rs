//! File-system persistence for collected datasets and analysis reports.
//! Everything is stored as named JSON blobs; datasets under one directory,
//! analyses under another.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use trendscope_core::{AnalysisResult, CollectedDataset, CoreError, StorageError};

const ANALYSIS_PREFIX: &str = "analysis_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub struct DataStore {
    data_dir: PathBuf,
    reports_dir: PathBuf,
}

impl DataStore {
    pub fn new(data_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let data_dir = data_dir.into();
        let reports_dir = reports_dir.into();
        fs::create_dir_all(&data_dir)?;
        fs::create_dir_all(&reports_dir)?;
        Ok(Self {
            data_dir,
            reports_dir,
        })
    }

    /// Persist a dataset and return the generated file name. Single-community
    /// datasets are prefixed with the community name, combined runs with
    /// "combined".
    pub fn save_dataset(&self, dataset: &CollectedDataset) -> Result<String, CoreError> {
        let prefix = match dataset.subreddits.as_slice() {
            [only] => sanitize_prefix(only),
            _ => "combined".to_string(),
        };
        let filename = format!(
            "{prefix}_{}.json",
            dataset.collected_at.format(TIMESTAMP_FORMAT)
        );
        self.write_json(&self.data_dir, &filename, dataset)?;
        info!(filename, posts = dataset.posts.len(), "saved dataset");
        Ok(filename)
    }

    pub fn load_dataset(&self, filename: &str) -> Result<CollectedDataset, CoreError> {
        let path = checked_path(&self.data_dir, filename)?;
        self.read_json(&path, filename)
    }

    pub fn save_analysis(&self, analysis: &AnalysisResult) -> Result<String, CoreError> {
        let filename = format!(
            "{ANALYSIS_PREFIX}{}.json",
            analysis.analysis_date.format(TIMESTAMP_FORMAT)
        );
        self.write_json(&self.reports_dir, &filename, analysis)?;
        info!(filename, "saved analysis report");
        Ok(filename)
    }

    pub fn load_analysis(&self, filename: &str) -> Result<AnalysisResult, CoreError> {
        let path = checked_path(&self.reports_dir, filename)?;
        self.read_json(&path, filename)
    }

    /// Stored dataset file names, newest first.
    pub fn list_datasets(&self) -> Result<Vec<String>, CoreError> {
        list_json_files(&self.data_dir)
    }

    /// Stored analysis file names, newest first.
    pub fn list_analyses(&self) -> Result<Vec<String>, CoreError> {
        list_json_files(&self.reports_dir)
    }

    /// The most recently written analysis report.
    pub fn latest_analysis(&self) -> Result<AnalysisResult, CoreError> {
        let latest = self
            .list_analyses()?
            .into_iter()
            .find(|name| name.starts_with(ANALYSIS_PREFIX))
            .ok_or_else(|| CoreError::NotFound {
                resource: "analysis report".to_string(),
            })?;
        self.load_analysis(&latest)
    }

    /// Untyped read of a stored blob, checking the data directory first and
    /// falling back to the reports directory.
    pub fn load_raw(&self, filename: &str) -> Result<serde_json::Value, CoreError> {
        let data_path = checked_path(&self.data_dir, filename)?;
        if data_path.is_file() {
            return self.read_json(&data_path, filename);
        }
        let report_path = checked_path(&self.reports_dir, filename)?;
        if report_path.is_file() {
            return self.read_json(&report_path, filename);
        }
        Err(CoreError::NotFound {
            resource: filename.to_string(),
        })
    }

    fn write_json<T: serde::Serialize>(
        &self,
        dir: &Path,
        filename: &str,
        value: &T,
    ) -> Result<(), CoreError> {
        let path = checked_path(dir, filename)?;
        let body = serde_json::to_vec_pretty(value)?;
        fs::write(&path, body).map_err(|e| {
            CoreError::Storage(StorageError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        debug!(path = %path.display(), "wrote json blob");
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
        filename: &str,
    ) -> Result<T, CoreError> {
        if !path.is_file() {
            return Err(CoreError::NotFound {
                resource: filename.to_string(),
            });
        }
        let body = fs::read(path).map_err(|e| {
            CoreError::Storage(StorageError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Rejects anything that could escape the storage directory.
fn checked_path(dir: &Path, filename: &str) -> Result<PathBuf, CoreError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(CoreError::Storage(StorageError::InvalidFileName {
            name: filename.to_string(),
        }));
    }
    Ok(dir.join(filename))
}

fn sanitize_prefix(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "dataset".to_string()
    } else {
        cleaned
    }
}

fn list_json_files(dir: &Path) -> Result<Vec<String>, CoreError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && entry.path().is_file() {
            names.push(name);
        }
    }
    // Timestamped names sort newest first in reverse lexical order.
    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trendscope_core::{CategorySummary, TimePeriod};

    fn store() -> (DataStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path().join("data"), dir.path().join("reports")).unwrap();
        (store, dir)
    }

    fn dataset(subreddits: &[&str], at: chrono::DateTime<Utc>) -> CollectedDataset {
        CollectedDataset {
            subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
            posts: vec![],
            comments: vec![],
            collected_at: at,
            time_period_days: 7,
        }
    }

    fn analysis(at: chrono::DateTime<Utc>) -> AnalysisResult {
        AnalysisResult {
            analysis_date: at,
            time_period: TimePeriod {
                start: at - chrono::Duration::days(7),
                end: at,
                days: 7,
            },
            subreddits_analyzed: 1,
            total_posts: 0,
            total_comments: 0,
            trending_topics: vec![],
            common_questions: vec![],
            keyword_frequencies: vec![],
            category_summaries: CategorySummary {
                total_posts: 0,
                total_comments: 0,
                subreddits_analyzed: 1,
                top_keywords: vec![],
                top_questions: vec![],
                trending_topics_count: 0,
                common_questions_count: 0,
            },
        }
    }

    #[test]
    fn test_dataset_roundtrip_and_naming() {
        let (store, _dir) = store();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();

        let single = store.save_dataset(&dataset(&["rust"], at)).unwrap();
        assert_eq!(single, "rust_20250601_123000.json");

        let loaded = store.load_dataset(&single).unwrap();
        assert_eq!(loaded.subreddits, vec!["rust".to_string()]);

        let multi = store
            .save_dataset(&dataset(&["rust", "programming"], at))
            .unwrap();
        assert!(multi.starts_with("combined_"));
    }

    #[test]
    fn test_missing_dataset_is_not_found() {
        let (store, _dir) = store();
        let err = store.load_dataset("nope.json").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_path_escapes_are_rejected() {
        let (store, _dir) = store();
        for name in ["../sneaky.json", "a/b.json", "a\\b.json", ""] {
            let err = store.load_dataset(name).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Storage(StorageError::InvalidFileName { .. })
            ));
        }
    }

    #[test]
    fn test_latest_analysis_picks_newest() {
        let (store, _dir) = store();
        let older = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        store.save_analysis(&analysis(older)).unwrap();
        store.save_analysis(&analysis(newer)).unwrap();

        let latest = store.latest_analysis().unwrap();
        assert_eq!(latest.analysis_date, newer);
    }

    #[test]
    fn test_latest_analysis_without_reports_is_not_found() {
        let (store, _dir) = store();
        let err = store.latest_analysis().unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_load_raw_checks_both_directories() {
        let (store, _dir) = store();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let data_file = store.save_dataset(&dataset(&["rust"], at)).unwrap();
        let report_file = store.save_analysis(&analysis(at)).unwrap();

        assert!(store.load_raw(&data_file).unwrap().is_object());
        assert!(store.load_raw(&report_file).unwrap().is_object());
        assert!(matches!(
            store.load_raw("absent.json").unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn test_listings_are_newest_first() {
        let (store, _dir) = store();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap();
        store.save_dataset(&dataset(&["rust"], t1)).unwrap();
        store.save_dataset(&dataset(&["rust"], t2)).unwrap();

        let names = store.list_datasets().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].contains("20250603"));
    }
}
