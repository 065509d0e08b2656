use std::collections::HashMap;

use trendscope_core::{EngagementAverages, ExtractedQuestion, PostSummary, RedditComment, RedditPost};

/// Interrogative openers that mark a text as a question even without a
/// trailing question mark.
const QUESTION_STARTERS: &[&str] = &[
    "what", "how", "why", "when", "where", "can", "should", "is", "are",
];

/// Near-duplicate grouping key length, in characters of the normalized text.
const GROUP_KEY_LEN: usize = 50;

/// Comment bodies are clipped to this many characters before storage. The
/// question check runs on the full text.
const COMMENT_SNIPPET_LEN: usize = 200;

const MAX_POSTS_PER_QUESTION: usize = 5;
const MAX_QUESTIONS: usize = 20;

pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let lower = trimmed.to_lowercase();
    QUESTION_STARTERS.iter().any(|starter| {
        lower
            .strip_prefix(starter)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    })
}

fn group_key(text: &str) -> String {
    text.trim().to_lowercase().chars().take(GROUP_KEY_LEN).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct Occurrence {
    text: String,
    post_index: usize,
}

/// Question-shaped texts from post titles and comment bodies, grouped by
/// near-duplicate key and kept only when seen at least twice. Comments whose
/// post is not in the dataset are skipped.
pub fn extract_questions(
    posts: &[RedditPost],
    comments: &[RedditComment],
) -> Vec<ExtractedQuestion> {
    let post_index: HashMap<&str, usize> = posts
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut occurrences = Vec::new();
    for (i, post) in posts.iter().enumerate() {
        if is_question(&post.title) {
            occurrences.push(Occurrence {
                text: post.title.clone(),
                post_index: i,
            });
        }
    }
    for comment in comments {
        let Some(&pi) = post_index.get(comment.post_id.as_str()) else {
            continue;
        };
        if is_question(&comment.body) {
            occurrences.push(Occurrence {
                text: comment.body.chars().take(COMMENT_SNIPPET_LEN).collect(),
                post_index: pi,
            });
        }
    }

    // Insertion-ordered grouping keeps repeated runs deterministic.
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Occurrence>> = HashMap::new();
    for occurrence in occurrences {
        let key = group_key(&occurrence.text);
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(occurrence);
    }

    let mut questions = Vec::new();
    for key in &group_order {
        let group = &groups[key];
        if group.len() < 2 {
            continue;
        }

        let mut subreddits: Vec<String> = Vec::new();
        let mut summaries = Vec::new();
        let mut upvotes_sum = 0.0;
        let mut comments_sum = 0.0;
        for occurrence in group {
            let post = &posts[occurrence.post_index];
            if !subreddits.contains(&post.subreddit) {
                subreddits.push(post.subreddit.clone());
            }
            if summaries.len() < MAX_POSTS_PER_QUESTION {
                summaries.push(PostSummary {
                    title: post.title.clone(),
                    upvotes: post.upvotes,
                    comments: post.comment_count,
                    subreddit: post.subreddit.clone(),
                });
            }
            upvotes_sum += post.upvotes as f64;
            comments_sum += post.comment_count as f64;
        }

        let count = group.len() as f64;
        questions.push(ExtractedQuestion {
            question: group[0].text.clone(),
            frequency: group.len() as u64,
            subreddits,
            posts: summaries,
            avg_engagement: EngagementAverages {
                avg_upvotes: round2(upvotes_sum / count),
                avg_comments: round2(comments_sum / count),
            },
        });
    }

    questions.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    questions.truncate(MAX_QUESTIONS);
    questions
}
