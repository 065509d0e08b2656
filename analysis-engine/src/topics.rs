use trendscope_core::{KeywordFrequency, PostSummary, RedditPost, Trend, TrendingTopic};

use crate::keywords::post_text;

/// Only the highest-frequency keywords are promoted to topics.
const TOPIC_CANDIDATES: usize = 30;

/// At most this many anonymized post references per topic.
const MAX_POSTS_PER_TOPIC: usize = 5;

/// Thresholds are strict: exactly 50 mentions is "rising", not
/// "rapidly_rising".
pub fn classify_trend(mentions: u64) -> Trend {
    if mentions > 50 {
        Trend::RapidlyRising
    } else if mentions > 20 {
        Trend::Rising
    } else if mentions > 10 {
        Trend::Stable
    } else {
        Trend::Declining
    }
}

/// Promote the leading keywords to topics, each carrying a trend label and up
/// to five anonymized post summaries found by literal substring scan.
pub fn identify_trending_topics(
    keywords: &[KeywordFrequency],
    posts: &[RedditPost],
) -> Vec<TrendingTopic> {
    keywords
        .iter()
        .take(TOPIC_CANDIDATES)
        .map(|keyword| {
            let mut summaries = Vec::new();
            for post in posts {
                if post_text(post).to_lowercase().contains(&keyword.keyword) {
                    summaries.push(PostSummary {
                        title: post.title.clone(),
                        upvotes: post.upvotes,
                        comments: post.comment_count,
                        subreddit: post.subreddit.clone(),
                    });
                    if summaries.len() >= MAX_POSTS_PER_TOPIC {
                        break;
                    }
                }
            }
            TrendingTopic {
                topic: keyword.keyword.clone(),
                mentions: keyword.frequency,
                trend: classify_trend(keyword.frequency),
                subreddits: keyword.subreddits.clone(),
                change_percentage: None,
                posts: summaries,
            }
        })
        .collect()
}
