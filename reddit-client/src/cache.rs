use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use trendscope_core::CoreError;

/// Which expiry policy applies to a cached payload. Comment batches age out
/// faster than post batches because comment scores go stale sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    PostBatch,
    CommentBatch,
}

impl CacheKind {
    fn as_str(self) -> &'static str {
        match self {
            CacheKind::PostBatch => "post_batch",
            CacheKind::CommentBatch => "comment_batch",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    kind: CacheKind,
    data: serde_json::Value,
}

/// Content-addressed local cache for Reddit API responses.
///
/// Keys are derived from the semantic request parameters, so two requests
/// that mean the same thing hit the same entry regardless of argument
/// ordering, while any parameter difference is a miss rather than a stale
/// partial match.
#[derive(Debug)]
pub struct CacheManager {
    cache_dir: PathBuf,
    post_expiry: Duration,
    comment_expiry: Duration,
}

impl CacheManager {
    pub fn new(
        cache_dir: impl AsRef<Path>,
        post_expiry_hours: i64,
        comment_expiry_minutes: i64,
    ) -> Result<Self, CoreError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            post_expiry: Duration::hours(post_expiry_hours),
            comment_expiry: Duration::minutes(comment_expiry_minutes),
        })
    }

    fn expiry_for(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::PostBatch => self.post_expiry,
            CacheKind::CommentBatch => self.comment_expiry,
        }
    }

    /// Deterministic key over subject, kind, and all other parameters sorted
    /// by name. UUIDv5 is name-based, so the same semantic request always
    /// maps to the same file across runs.
    fn cache_key(subject: &str, kind: CacheKind, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);

        let mut parts = vec![subject.to_string(), kind.as_str().to_string()];
        for (name, value) in sorted {
            parts.push(format!("{name}:{value}"));
        }
        let key_string = parts.join("_");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key_string.as_bytes())
            .simple()
            .to_string()
    }

    fn entry_path(&self, subject: &str, kind: CacheKind, params: &[(&str, String)]) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", Self::cache_key(subject, kind, params)))
    }

    /// Fetch a cached payload if present and fresh. An expired entry is
    /// deleted and reported as a miss; unreadable entries are misses too.
    pub fn lookup<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        subject: &str,
        params: &[(&str, String)],
    ) -> Option<Vec<T>> {
        let path = self.entry_path(subject, kind, params);
        if !path.exists() {
            return None;
        }

        let entry: CacheEntry = match fs::read_to_string(&path)
            .map_err(CoreError::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(CoreError::from))
        {
            Ok(entry) => entry,
            Err(e) => {
                error!(path = %path.display(), error = %e, "error reading cache entry");
                return None;
            }
        };

        if Utc::now() - entry.cached_at > self.expiry_for(kind) {
            info!(subject, kind = kind.as_str(), "cache entry expired");
            if let Err(e) = fs::remove_file(&path) {
                error!(path = %path.display(), error = %e, "failed to delete expired cache entry");
            }
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => {
                info!(subject, kind = kind.as_str(), "cache hit");
                Some(data)
            }
            Err(e) => {
                error!(subject, error = %e, "cache entry payload did not deserialize");
                None
            }
        }
    }

    /// Write a payload under the computed key, overwriting any prior entry.
    pub fn store<T: Serialize>(
        &self,
        kind: CacheKind,
        subject: &str,
        params: &[(&str, String)],
        payload: &[T],
    ) -> Result<(), CoreError> {
        let entry = CacheEntry {
            cached_at: Utc::now(),
            kind,
            data: serde_json::to_value(payload)?,
        };
        let path = self.entry_path(subject, kind, params);
        fs::write(&path, serde_json::to_string_pretty(&entry)?)?;
        debug!(
            subject,
            kind = kind.as_str(),
            items = payload.len(),
            "cached payload"
        );
        Ok(())
    }

    /// True if a (possibly expired) entry exists for the given request shape.
    pub fn contains(&self, kind: CacheKind, subject: &str, params: &[(&str, String)]) -> bool {
        self.entry_path(subject, kind, params).exists()
    }

    /// Delete every entry whose age exceeds the expiry for its recorded kind.
    /// Entries that cannot be parsed are deleted unconditionally. Returns the
    /// number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let mut cleared = 0;
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to list cache directory");
                return 0;
            }
        };

        for file in entries.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let parsed: Result<CacheEntry, _> = fs::read_to_string(&path)
                .map_err(CoreError::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(CoreError::from));

            let expired = match parsed {
                Ok(entry) => Utc::now() - entry.cached_at > self.expiry_for(entry.kind),
                // Unreadable entries are evicted rather than left to poison lookups.
                Err(_) => true,
            };

            if expired && fs::remove_file(&path).is_ok() {
                cleared += 1;
            }
        }

        if cleared > 0 {
            info!(cleared, "swept expired cache entries");
        }
        cleared
    }

    /// Unconditional full wipe.
    pub fn clear_all(&self) -> Result<(), CoreError> {
        for file in fs::read_dir(&self.cache_dir)?.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path)?;
            }
        }
        info!("cache cleared");
        Ok(())
    }
}
