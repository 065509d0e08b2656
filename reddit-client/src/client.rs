use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use trendscope_core::{CollectedDataset, CoreError, RedditComment, RedditPost};

use crate::cache::{CacheKind, CacheManager};
use crate::provider::{ContentProvider, ProviderComment, ProviderPost};
use crate::rate_limiter::RateLimiter;

/// Pause between per-post comment fetches within one subreddit, so the
/// provider never sees a micro-burst even inside the rate-limit budget.
const COMMENT_FETCH_PAUSE: Duration = Duration::from_millis(100);

/// Extra attempts after a throttling failure. Exactly one retry; a second
/// consecutive throttle propagates.
const FETCH_RETRY_BUDGET: u32 = 1;

/// Reddit content source with compliance guardrails: every fetch goes
/// through the cache first, then the shared rate limiter, and throttling
/// failures get one backoff-then-retry cycle.
pub struct RedditClient {
    provider: Arc<dyn ContentProvider>,
    rate_limiter: Arc<RateLimiter>,
    cache: CacheManager,
}

impl RedditClient {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        rate_limiter: Arc<RateLimiter>,
        cache: CacheManager,
    ) -> Self {
        Self {
            provider,
            rate_limiter,
            cache,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Delete expired cache entries; returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep_expired()
    }

    /// Hot posts from a subreddit, anonymized and filtered to the lookback
    /// window. Cached per (subreddit, limit, time filter).
    pub async fn fetch_posts(
        &self,
        subreddit: &str,
        limit: u32,
        time_period_days: i64,
    ) -> Result<Vec<RedditPost>, CoreError> {
        let time_filter = time_filter_for_days(time_period_days);
        let params = [
            ("limit", limit.to_string()),
            ("time_filter", time_filter.to_string()),
        ];

        let mut retries_left = FETCH_RETRY_BUDGET;
        loop {
            if let Some(cached) =
                self.cache
                    .lookup::<RedditPost>(CacheKind::PostBatch, subreddit, &params)
            {
                return Ok(cached);
            }

            self.rate_limiter.acquire().await;
            match self.provider.hot_posts(subreddit, limit).await {
                Ok(raw) => {
                    let posts =
                        convert_posts(subreddit, raw, limit, time_period_days, time_filter);
                    if let Err(e) =
                        self.cache
                            .store(CacheKind::PostBatch, subreddit, &params, &posts)
                    {
                        warn!(subreddit, error = %e, "failed to cache posts");
                    }
                    self.rate_limiter.reset_backoff().await;
                    info!(subreddit, count = posts.len(), "fetched posts");
                    return Ok(posts);
                }
                Err(e) if e.is_rate_limited() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(subreddit, error = %e, "throttled fetching posts, retrying after backoff");
                    self.rate_limiter.handle_rate_limit_error().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Top-level comments for a post, cached per (post id, limit).
    ///
    /// Comment loss is tolerated where post loss is not: any non-throttling
    /// failure degrades to an empty list instead of propagating.
    pub async fn fetch_comments(
        &self,
        post_id: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditComment>, CoreError> {
        let params = [("limit", limit.to_string())];

        let mut retries_left = FETCH_RETRY_BUDGET;
        loop {
            if let Some(cached) =
                self.cache
                    .lookup::<RedditComment>(CacheKind::CommentBatch, post_id, &params)
            {
                return Ok(cached);
            }

            self.rate_limiter.acquire().await;
            match self.provider.post_comments(post_id, limit).await {
                Ok(raw) => {
                    let comments = convert_comments(post_id, raw, limit);
                    if let Err(e) =
                        self.cache
                            .store(CacheKind::CommentBatch, post_id, &params, &comments)
                    {
                        warn!(post_id, error = %e, "failed to cache comments");
                    }
                    self.rate_limiter.reset_backoff().await;
                    debug!(post_id, subreddit, count = comments.len(), "fetched comments");
                    return Ok(comments);
                }
                Err(e) if e.is_rate_limited() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(post_id, error = %e, "throttled fetching comments, retrying after backoff");
                    self.rate_limiter.handle_rate_limit_error().await;
                }
                Err(e) if e.is_rate_limited() => return Err(e),
                Err(e) => {
                    error!(post_id, error = %e, "error fetching comments, continuing without them");
                    return Ok(Vec::new());
                }
            }
        }
    }

    /// Collect posts (and optionally their top comments) for one subreddit
    /// into a single-community dataset.
    pub async fn collect_subreddit(
        &self,
        subreddit: &str,
        posts_limit: u32,
        time_period_days: i64,
        include_comments: bool,
        top_comments_limit: u32,
    ) -> Result<CollectedDataset, CoreError> {
        info!(subreddit, "collecting data");

        let posts = self
            .fetch_posts(subreddit, posts_limit, time_period_days)
            .await?;

        let mut comments = Vec::new();
        if include_comments {
            for post in &posts {
                let mut post_comments = self
                    .fetch_comments(&post.id, subreddit, top_comments_limit)
                    .await?;
                comments.append(&mut post_comments);
                sleep(COMMENT_FETCH_PAUSE).await;
            }
        }

        Ok(CollectedDataset {
            subreddits: vec![subreddit.to_string()],
            posts,
            comments,
            collected_at: Utc::now(),
            time_period_days,
        })
    }
}

/// Map a lookback in days onto Reddit's coarse time-filter vocabulary.
fn time_filter_for_days(days: i64) -> &'static str {
    if days <= 1 {
        "day"
    } else if days <= 7 {
        "week"
    } else if days <= 30 {
        "month"
    } else if days <= 365 {
        "year"
    } else {
        "all"
    }
}

fn convert_posts(
    subreddit: &str,
    raw: Vec<ProviderPost>,
    limit: u32,
    time_period_days: i64,
    time_filter: &str,
) -> Vec<RedditPost> {
    let cutoff = Utc::now() - chrono::Duration::days(time_period_days);
    let mut posts = Vec::new();

    for item in raw {
        let Some(created) = DateTime::from_timestamp(item.created_utc, 0) else {
            debug!(post_id = %item.id, "skipping post with invalid timestamp");
            continue;
        };
        if time_filter != "all" && created < cutoff {
            continue;
        }

        posts.push(RedditPost {
            id: item.id,
            title: item.title,
            content: if item.body.is_empty() {
                None
            } else {
                Some(item.body)
            },
            // Anonymized: the author is never carried over.
            author: None,
            subreddit: subreddit.to_string(),
            upvotes: item.score,
            comment_count: item.comment_count,
            created_utc: created,
            score: item.score,
        });

        if posts.len() >= limit as usize {
            break;
        }
    }
    posts
}

fn convert_comments(post_id: &str, raw: Vec<ProviderComment>, limit: u32) -> Vec<RedditComment> {
    let mut comments = Vec::new();

    for item in raw {
        // Only direct replies to the post itself are retained.
        if !item.parent_id.starts_with("t3_") {
            continue;
        }
        let Some(created) = DateTime::from_timestamp(item.created_utc, 0) else {
            debug!(comment_id = %item.id, "skipping comment with invalid timestamp");
            continue;
        };

        comments.push(RedditComment {
            id: item.id,
            body: item.body,
            author: None,
            upvotes: item.score,
            created_utc: created,
            post_id: post_id.to_string(),
            is_top_level: true,
        });

        if comments.len() >= limit as usize {
            break;
        }
    }
    comments
}
