use std::collections::HashMap;

use trendscope_core::{KeywordFrequency, RedditComment, RedditPost};

/// Tokens shorter than this never make it out of the tokenizer.
const MIN_RUN_LEN: usize = 3;

/// Keywords must be strictly longer than this after stop-word filtering.
const MIN_KEYWORD_LEN: usize = 3;

/// At most this many referencing post ids are kept per keyword.
const MAX_POSTS_PER_KEYWORD: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "let", "put", "say", "she", "too", "use", "reddit",
    "subreddit",
];

/// Lowercased alphabetic runs of length >= 3. Digits, punctuation and
/// whitespace all act as separators.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphabetic() {
            current.push(ch.to_ascii_lowercase());
        } else if current.len() >= MIN_RUN_LEN {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= MIN_RUN_LEN {
        tokens.push(current);
    }
    tokens
}

pub(crate) fn post_text(post: &RedditPost) -> String {
    match &post.content {
        Some(body) => format!("{} {}", post.title, body),
        None => post.title.clone(),
    }
}

#[derive(Default)]
struct TokenStats {
    frequency: u64,
    // Insertion-ordered and deduped so repeated runs enumerate identically.
    post_indices: Vec<usize>,
}

/// Token table with insertion-ordered entries. A plain HashMap would make
/// frequency ties enumerate in arbitrary order across runs.
#[derive(Default)]
struct TokenTable {
    index: HashMap<String, usize>,
    entries: Vec<(String, TokenStats)>,
}

impl TokenTable {
    fn record(&mut self, token: String, post_index: Option<usize>) {
        let idx = match self.index.get(&token) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.index.insert(token.clone(), i);
                self.entries.push((token, TokenStats::default()));
                i
            }
        };
        let stats = &mut self.entries[idx].1;
        stats.frequency += 1;
        if let Some(p) = post_index {
            if !stats.post_indices.contains(&p) {
                stats.post_indices.push(p);
            }
        }
    }
}

/// Frequency-ranked keywords across all post titles, post bodies and comment
/// bodies. Comment occurrences are attributed to the comment's parent post;
/// comments whose post is not in the dataset still count toward the global
/// frequency but attribute nowhere.
pub fn extract_keywords(
    posts: &[RedditPost],
    comments: &[RedditComment],
    top_n: usize,
) -> Vec<KeywordFrequency> {
    let post_index: HashMap<&str, usize> = posts
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut table = TokenTable::default();
    for (i, post) in posts.iter().enumerate() {
        for token in tokenize(&post_text(post)) {
            table.record(token, Some(i));
        }
    }
    for comment in comments {
        let attributed = post_index.get(comment.post_id.as_str()).copied();
        for token in tokenize(&comment.body) {
            table.record(token, attributed);
        }
    }

    // Stable sort keeps insertion order within equal frequencies.
    let mut order: Vec<usize> = (0..table.entries.len()).collect();
    order.sort_by(|&a, &b| table.entries[b].1.frequency.cmp(&table.entries[a].1.frequency));

    // Pull extra candidates so stop-word loss does not starve the result.
    let mut keywords = Vec::new();
    for &idx in order.iter().take(top_n * 2) {
        let (token, stats) = &table.entries[idx];
        if token.len() <= MIN_KEYWORD_LEN || STOP_WORDS.contains(&token.as_str()) {
            continue;
        }

        let mut subreddits: Vec<String> = Vec::new();
        for &pi in &stats.post_indices {
            let subreddit = &posts[pi].subreddit;
            if !subreddits.contains(subreddit) {
                subreddits.push(subreddit.clone());
            }
        }
        let attributed_posts = stats
            .post_indices
            .iter()
            .take(MAX_POSTS_PER_KEYWORD)
            .map(|&pi| posts[pi].id.clone())
            .collect();

        keywords.push(KeywordFrequency {
            keyword: token.clone(),
            frequency: stats.frequency,
            subreddits,
            posts: attributed_posts,
        });
        if keywords.len() >= top_n {
            break;
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(id: &str, subreddit: &str, title: &str, body: Option<&str>) -> RedditPost {
        RedditPost {
            id: id.to_string(),
            title: title.to_string(),
            content: body.map(str::to_string),
            author: None,
            subreddit: subreddit.to_string(),
            upvotes: 10,
            comment_count: 2,
            created_utc: Utc::now(),
            score: 10,
        }
    }

    fn comment(id: &str, post_id: &str, body: &str) -> RedditComment {
        RedditComment {
            id: id.to_string(),
            body: body.to_string(),
            author: None,
            upvotes: 1,
            created_utc: Utc::now(),
            post_id: post_id.to_string(),
            is_top_level: true,
        }
    }

    #[test]
    fn test_tokenize_drops_short_runs_and_punctuation() {
        assert_eq!(
            tokenize("GPT-4 is amazing, truly amazing!"),
            vec!["gpt", "amazing", "truly", "amazing"]
        );
        assert_eq!(tokenize("a bb ccc"), vec!["ccc"]);
        assert!(tokenize("12 34 !?").is_empty());
    }

    #[test]
    fn test_keyword_frequency_and_community_attribution() {
        let posts = vec![
            post("p1", "alpha", "prompting tips", Some("better prompting, more prompting")),
            post("p2", "beta", "prompting guide", Some("prompting basics")),
        ];

        let keywords = extract_keywords(&posts, &[], 50);
        let prompting = keywords
            .iter()
            .find(|k| k.keyword == "prompting")
            .expect("prompting should be extracted");
        assert_eq!(prompting.frequency, 5);
        assert_eq!(prompting.subreddits, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(prompting.posts, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn test_comment_tokens_attribute_to_parent_post() {
        let posts = vec![post("p1", "alpha", "weekly thread", None)];
        let comments = vec![
            comment("c1", "p1", "training training training"),
            comment("c2", "orphan", "training elsewhere"),
        ];

        let keywords = extract_keywords(&posts, &comments, 50);
        let training = keywords.iter().find(|k| k.keyword == "training").unwrap();
        // Orphaned comment still counts globally but attributes no post.
        assert_eq!(training.frequency, 4);
        assert_eq!(training.posts, vec!["p1".to_string()]);
        assert_eq!(training.subreddits, vec!["alpha".to_string()]);
    }

    #[test]
    fn test_stop_words_and_short_tokens_filtered() {
        let posts = vec![post(
            "p1",
            "alpha",
            "the way you can use all the new models",
            None,
        )];
        let keywords = extract_keywords(&posts, &[], 50);
        let tokens: Vec<&str> = keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(tokens, vec!["models"]);
    }

    #[test]
    fn test_tie_order_is_deterministic() {
        let posts = vec![post("p1", "alpha", "zebra apple zebra apple", None)];
        let first = extract_keywords(&posts, &[], 50);
        let second = extract_keywords(&posts, &[], 50);
        let order: Vec<&str> = first.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(order, vec!["zebra", "apple"]);
        assert_eq!(
            order,
            second.iter().map(|k| k.keyword.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_top_n_caps_output() {
        let posts = vec![post(
            "p1",
            "alpha",
            "alpha bravo charlie delta echoes foxtrot",
            None,
        )];
        let keywords = extract_keywords(&posts, &[], 3);
        assert_eq!(keywords.len(), 3);
    }
}
