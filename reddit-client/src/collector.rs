use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use trendscope_core::CollectedDataset;

use crate::client::RedditClient;

/// Walks a list of subreddits sequentially and merges the per-community
/// results into one dataset. A failing community is logged and skipped so a
/// single bad subreddit cannot sink a whole run.
pub struct Collector {
    client: Arc<RedditClient>,
}

impl Collector {
    pub fn new(client: Arc<RedditClient>) -> Self {
        Self { client }
    }

    pub async fn collect_all(
        &self,
        subreddits: &[String],
        posts_per_subreddit: u32,
        time_period_days: i64,
        include_comments: bool,
        top_comments_limit: u32,
    ) -> CollectedDataset {
        let mut dataset = CollectedDataset {
            subreddits: Vec::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            collected_at: Utc::now(),
            time_period_days,
        };

        for subreddit in subreddits {
            match self
                .client
                .collect_subreddit(
                    subreddit,
                    posts_per_subreddit,
                    time_period_days,
                    include_comments,
                    top_comments_limit,
                )
                .await
            {
                Ok(partial) => {
                    info!(
                        subreddit,
                        posts = partial.posts.len(),
                        comments = partial.comments.len(),
                        "collected subreddit"
                    );
                    dataset.subreddits.push(subreddit.clone());
                    dataset.posts.extend(partial.posts);
                    dataset.comments.extend(partial.comments);
                }
                Err(e) => {
                    error!(subreddit, error = %e, "failed to collect subreddit, skipping");
                }
            }
        }

        info!(
            subreddits = dataset.subreddits.len(),
            posts = dataset.posts.len(),
            comments = dataset.comments.len(),
            "collection run finished"
        );
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::provider::{ContentProvider, ProviderComment, ProviderPost};
    use crate::rate_limiter::RateLimiter;
    use async_trait::async_trait;
    use trendscope_core::{CoreError, RedditApiError};

    /// Serves posts for every subreddit except the ones listed as missing.
    struct SelectiveProvider {
        missing: Vec<String>,
    }

    #[async_trait]
    impl ContentProvider for SelectiveProvider {
        async fn hot_posts(
            &self,
            subreddit: &str,
            _limit: u32,
        ) -> Result<Vec<ProviderPost>, CoreError> {
            if self.missing.iter().any(|s| s == subreddit) {
                return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                }));
            }
            Ok(vec![ProviderPost {
                id: format!("{subreddit}_post"),
                title: format!("Hello from {subreddit}"),
                body: String::new(),
                score: 5,
                comment_count: 0,
                created_utc: Utc::now().timestamp(),
            }])
        }

        async fn post_comments(
            &self,
            _post_id: &str,
            _limit: u32,
        ) -> Result<Vec<ProviderComment>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn collector_with(provider: SelectiveProvider) -> (Collector, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RedditClient::new(
            Arc::new(provider),
            Arc::new(RateLimiter::new(60)),
            CacheManager::new(dir.path(), 1, 30).unwrap(),
        ));
        (Collector::new(client), dir)
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_merges_communities() {
        let (collector, _dir) = collector_with(SelectiveProvider { missing: vec![] });
        let subreddits = vec!["rust".to_string(), "programming".to_string()];

        let dataset = collector.collect_all(&subreddits, 10, 7, false, 5).await;
        assert_eq!(dataset.subreddits, subreddits);
        assert_eq!(dataset.posts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_skips_failing_community() {
        let (collector, _dir) = collector_with(SelectiveProvider {
            missing: vec!["gone".to_string()],
        });
        let subreddits = vec![
            "rust".to_string(),
            "gone".to_string(),
            "programming".to_string(),
        ];

        let dataset = collector.collect_all(&subreddits, 10, 7, false, 5).await;
        assert_eq!(
            dataset.subreddits,
            vec!["rust".to_string(), "programming".to_string()]
        );
        assert_eq!(dataset.posts.len(), 2);
    }
}
