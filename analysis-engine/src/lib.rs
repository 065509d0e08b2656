//! Frequency-based trend analysis over collected Reddit datasets: keyword
//! extraction, topic classification and repeated-question detection. This is
//! deliberately a simple counting model, not TF-IDF.

pub mod keywords;
pub mod questions;
pub mod topics;

use chrono::{Duration, Utc};
use tracing::info;

use trendscope_core::{AnalysisResult, CategorySummary, CollectedDataset, TimePeriod};

pub use keywords::extract_keywords;
pub use questions::extract_questions;
pub use topics::identify_trending_topics;

/// Keywords extracted per analysis run.
const TOP_KEYWORDS: usize = 50;

/// Keywords echoed into the category summary.
const SUMMARY_KEYWORDS: usize = 10;

/// Questions echoed into the category summary.
const SUMMARY_QUESTIONS: usize = 5;

#[derive(Debug, Default)]
pub struct AnalysisEngine;

impl AnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run the full analysis pass over one dataset. Everything is recomputed
    /// from scratch; nothing is incremental.
    pub fn analyze(&self, dataset: &CollectedDataset) -> AnalysisResult {
        info!(
            posts = dataset.posts.len(),
            comments = dataset.comments.len(),
            subreddits = dataset.subreddits.len(),
            "analyzing dataset"
        );

        let keywords = extract_keywords(&dataset.posts, &dataset.comments, TOP_KEYWORDS);
        let trending_topics = identify_trending_topics(&keywords, &dataset.posts);
        let common_questions = extract_questions(&dataset.posts, &dataset.comments);

        // Datasets from a single-community collection may carry no community
        // list at all; they still count as one.
        let subreddits_analyzed = dataset.subreddits.len().max(1);
        let days = dataset.time_period_days;
        let now = Utc::now();

        let category_summaries = CategorySummary {
            total_posts: dataset.posts.len(),
            total_comments: dataset.comments.len(),
            subreddits_analyzed,
            top_keywords: keywords
                .iter()
                .take(SUMMARY_KEYWORDS)
                .map(|k| k.keyword.clone())
                .collect(),
            top_questions: common_questions
                .iter()
                .take(SUMMARY_QUESTIONS)
                .map(|q| q.question.clone())
                .collect(),
            trending_topics_count: trending_topics.len(),
            common_questions_count: common_questions.len(),
        };

        AnalysisResult {
            analysis_date: now,
            time_period: TimePeriod {
                start: now - Duration::days(days),
                end: now,
                days,
            },
            subreddits_analyzed,
            total_posts: dataset.posts.len(),
            total_comments: dataset.comments.len(),
            trending_topics,
            common_questions,
            keyword_frequencies: keywords,
            category_summaries,
        }
    }
}
