use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post pulled from a subreddit's hot listing.
///
/// Posts are stored anonymized: the author and any direct links are never
/// populated, neither on fetch nor on cache/storage round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    pub upvotes: i64,
    pub comment_count: u32,
    pub created_utc: DateTime<Utc>,
    pub score: i64,
}

/// A top-level comment on a post. Replies nested under other comments are
/// discarded during collection. Anonymized like [`RedditPost`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditComment {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    pub upvotes: i64,
    pub created_utc: DateTime<Utc>,
    pub post_id: String,
    #[serde(default = "default_true")]
    pub is_top_level: bool,
}

fn default_true() -> bool {
    true
}

fn default_time_period_days() -> i64 {
    7
}

/// One collection run across one or more subreddits. Persisted verbatim and
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedDataset {
    #[serde(default)]
    pub subreddits: Vec<String>,
    pub posts: Vec<RedditPost>,
    pub comments: Vec<RedditComment>,
    pub collected_at: DateTime<Utc>,
    #[serde(default = "default_time_period_days")]
    pub time_period_days: i64,
}

/// A lowercase token with its raw occurrence count across all analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordFrequency {
    pub keyword: String,
    pub frequency: u64,
    pub subreddits: Vec<String>,
    /// Up to 10 ids of posts whose text (or attributed comments) contain the keyword.
    pub posts: Vec<String>,
}

/// Anonymized post reference carried in topics and questions. Never exposes
/// the author or a link back to the post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub upvotes: i64,
    pub comments: u32,
    pub subreddit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    RapidlyRising,
    Rising,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub mentions: u64,
    pub trend: Trend,
    pub subreddits: Vec<String>,
    /// Always `None`: no historical baseline is tracked.
    pub change_percentage: Option<f64>,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementAverages {
    pub avg_upvotes: f64,
    pub avg_comments: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedQuestion {
    pub question: String,
    pub frequency: u64,
    pub subreddits: Vec<String>,
    pub posts: Vec<PostSummary>,
    pub avg_engagement: EngagementAverages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total_posts: usize,
    pub total_comments: usize,
    pub subreddits_analyzed: usize,
    pub top_keywords: Vec<String>,
    pub top_questions: Vec<String>,
    pub trending_topics_count: usize,
    pub common_questions_count: usize,
}

/// Output of one analysis pass. Created once, persisted, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_date: DateTime<Utc>,
    pub time_period: TimePeriod,
    pub subreddits_analyzed: usize,
    pub total_posts: usize,
    pub total_comments: usize,
    pub trending_topics: Vec<TrendingTopic>,
    pub common_questions: Vec<ExtractedQuestion>,
    pub keyword_frequencies: Vec<KeywordFrequency>,
    pub category_summaries: CategorySummary,
}

/// Parameters for a collection run. Omitted fields take the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRequest {
    #[serde(default)]
    pub subreddits: Option<Vec<String>>,
    #[serde(default = "CollectionRequest::default_posts_per_subreddit")]
    pub posts_per_subreddit: u32,
    #[serde(default = "default_time_period_days")]
    pub time_period_days: i64,
    #[serde(default = "default_true")]
    pub include_comments: bool,
    #[serde(default = "CollectionRequest::default_top_comments_limit")]
    pub top_comments_limit: u32,
}

impl CollectionRequest {
    fn default_posts_per_subreddit() -> u32 {
        100
    }

    fn default_top_comments_limit() -> u32 {
        10
    }
}

impl Default for CollectionRequest {
    fn default() -> Self {
        Self {
            subreddits: None,
            posts_per_subreddit: Self::default_posts_per_subreddit(),
            time_period_days: default_time_period_days(),
            include_comments: true,
            top_comments_limit: Self::default_top_comments_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub success: bool,
    pub message: String,
    pub subreddits_collected: usize,
    pub total_posts: usize,
    pub total_comments: usize,
    pub data_file: String,
    pub collected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_serialization() {
        assert_eq!(
            serde_json::to_string(&Trend::RapidlyRising).unwrap(),
            "\"rapidly_rising\""
        );
        assert_eq!(serde_json::to_string(&Trend::Declining).unwrap(), "\"declining\"");
    }

    #[test]
    fn test_collection_request_defaults() {
        let req: CollectionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.subreddits, None);
        assert_eq!(req.posts_per_subreddit, 100);
        assert_eq!(req.time_period_days, 7);
        assert!(req.include_comments);
        assert_eq!(req.top_comments_limit, 10);
    }

    #[test]
    fn test_dataset_defaults_on_load() {
        // Older blobs may lack the lookback field; it defaults to 7 days.
        let json = r#"{
            "posts": [],
            "comments": [],
            "collected_at": "2025-01-15T12:00:00Z"
        }"#;
        let dataset: CollectedDataset = serde_json::from_str(json).unwrap();
        assert!(dataset.subreddits.is_empty());
        assert_eq!(dataset.time_period_days, 7);
    }

    #[test]
    fn test_post_stays_anonymized_through_roundtrip() {
        let post = RedditPost {
            id: "abc".to_string(),
            title: "Test".to_string(),
            content: None,
            author: None,
            subreddit: "test".to_string(),
            upvotes: 10,
            comment_count: 2,
            created_utc: Utc::now(),
            score: 10,
        };
        let json = serde_json::to_string(&post).unwrap();
        let back: RedditPost = serde_json::from_str(&json).unwrap();
        assert_eq!(back.author, None);
    }
}
