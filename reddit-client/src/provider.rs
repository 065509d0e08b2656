use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

use trendscope_core::{CoreError, RedditApiError, RedditConfig};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Raw post record as delivered by the content provider, before
/// anonymization and time filtering.
#[derive(Debug, Clone)]
pub struct ProviderPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub score: i64,
    pub comment_count: u32,
    pub created_utc: i64,
}

/// Raw comment record from a flattened comment tree. `parent_id` is the
/// fullname of the parent: `t3_*` when the comment replies to the post
/// itself, `t1_*` when it replies to another comment.
#[derive(Debug, Clone)]
pub struct ProviderComment {
    pub id: String,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
    pub parent_id: String,
}

/// External content provider capability. Implementations must report a
/// quota violation as [`RedditApiError::RateLimitExceeded`] so the client
/// can apply backoff and its one-shot retry.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// A subreddit's hot listing, at most `limit` items, newest activity first.
    async fn hot_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<ProviderPost>, CoreError>;

    /// A post's comment tree, flattened with load-more placeholders dropped.
    async fn post_comments(
        &self,
        post_id: &str,
        limit: u32,
    ) -> Result<Vec<ProviderComment>, CoreError>;
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Reddit API implementation of [`ContentProvider`] using the app-only
/// client-credentials grant.
#[derive(Debug)]
pub struct RedditProvider {
    http_client: Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    token: Mutex<Option<AccessToken>>,
}

impl RedditProvider {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            user_agent: config.user_agent.clone(),
            token: Mutex::new(None),
        })
    }

    /// Cached app-only access token, refreshed one minute before expiry.
    async fn access_token(&self) -> Result<String, CoreError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Instant::now() < current.expires_at {
                return Ok(current.value.clone());
            }
        }

        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        debug!("requesting app-only access token");
        let response = self
            .http_client
            .post(REDDIT_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: format!("token endpoint returned {}", response.status()),
            }));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::MalformedResponse {
                details: format!("token response: {e}"),
            })
        })?;

        let lifetime = Duration::from_secs(parsed.expires_in.saturating_sub(60).max(1));
        let fresh = AccessToken {
            value: parsed.access_token,
            expires_at: Instant::now() + lifetime,
        };
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, CoreError> {
        let access_token = self.access_token().await?;
        let url = format!("{REDDIT_API_BASE}{endpoint}");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response, endpoint)?;
        response.json().await.map_err(|e| {
            error!(endpoint, error = %e, "provider response was not valid JSON");
            CoreError::RedditApi(RedditApiError::MalformedResponse {
                details: format!("{endpoint}: {e}"),
            })
        })
    }
}

#[async_trait]
impl ContentProvider for RedditProvider {
    async fn hot_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<ProviderPost>, CoreError> {
        let endpoint = format!("/r/{subreddit}/hot");
        let query = [
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];

        let value = match self.get_json(&endpoint, &query).await {
            Err(CoreError::NotFound { .. }) => {
                return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                }))
            }
            other => other?,
        };

        let posts = parse_post_listing(&value)?;
        info!(subreddit, count = posts.len(), "retrieved hot posts");
        Ok(posts)
    }

    async fn post_comments(
        &self,
        post_id: &str,
        limit: u32,
    ) -> Result<Vec<ProviderComment>, CoreError> {
        let endpoint = format!("/comments/{post_id}");
        let query = [
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];

        let value = match self.get_json(&endpoint, &query).await {
            Err(CoreError::NotFound { .. }) => {
                return Err(CoreError::RedditApi(RedditApiError::PostNotFound {
                    post_id: post_id.to_string(),
                }))
            }
            other => other?,
        };

        let comments = parse_comment_thread(&value)?;
        debug!(post_id, count = comments.len(), "retrieved comment tree");
        Ok(comments)
    }
}

fn map_send_error(e: reqwest::Error) -> CoreError {
    if e.is_timeout() {
        CoreError::RedditApi(RedditApiError::RequestTimeout)
    } else {
        CoreError::Network(e)
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!(endpoint, status = %status, "provider request failed");
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                retry_after,
            }))
        }
        StatusCode::UNAUTHORIZED => {
            Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "access token rejected".to_string(),
            }))
        }
        StatusCode::FORBIDDEN => Err(CoreError::RedditApi(RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        })),
        StatusCode::NOT_FOUND => Err(CoreError::NotFound {
            resource: endpoint.to_string(),
        }),
        s if s.is_server_error() => Err(CoreError::RedditApi(RedditApiError::ServerError {
            status_code: s.as_u16(),
        })),
        s => Err(CoreError::RedditApi(RedditApiError::MalformedResponse {
            details: format!("unexpected status {s} for {endpoint}"),
        })),
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    score: i64,
    num_comments: u32,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    parent_id: String,
}

/// Map a hot-listing payload into provider posts. A missing envelope is a
/// malformed response; an individual child that does not validate is skipped
/// so one bad item cannot sink the whole listing.
fn parse_post_listing(value: &Value) -> Result<Vec<ProviderPost>, CoreError> {
    let listing: Listing = serde_json::from_value(value.clone()).map_err(|e| {
        CoreError::RedditApi(RedditApiError::MalformedResponse {
            details: format!("post listing envelope: {e}"),
        })
    })?;

    let mut posts = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        if child.kind != "t3" {
            continue;
        }
        match serde_json::from_value::<PostData>(child.data) {
            Ok(data) => posts.push(ProviderPost {
                id: data.id,
                title: data.title,
                body: data.selftext,
                score: data.score,
                comment_count: data.num_comments,
                created_utc: data.created_utc as i64,
            }),
            Err(e) => debug!(error = %e, "skipping post item that failed validation"),
        }
    }
    Ok(posts)
}

/// Flatten a comment-thread payload (the `[post listing, comment listing]`
/// pair Reddit returns) into a flat comment list. Load-more placeholders are
/// dropped; nested replies are walked so the caller can filter by parent.
fn parse_comment_thread(value: &Value) -> Result<Vec<ProviderComment>, CoreError> {
    let comment_listing = value.as_array().and_then(|parts| parts.get(1)).ok_or_else(|| {
        CoreError::RedditApi(RedditApiError::MalformedResponse {
            details: "comment thread is not a two-part listing".to_string(),
        })
    })?;

    let mut comments = Vec::new();
    flatten_comment_listing(comment_listing, &mut comments);
    Ok(comments)
}

fn flatten_comment_listing(listing: &Value, out: &mut Vec<ProviderComment>) {
    let children = match listing.pointer("/data/children").and_then(Value::as_array) {
        Some(children) => children,
        None => return,
    };

    for child in children {
        let kind = child.get("kind").and_then(Value::as_str).unwrap_or_default();
        if kind != "t1" {
            // "more" placeholders and anything unexpected are dropped.
            continue;
        }
        let Some(data) = child.get("data") else {
            continue;
        };

        match serde_json::from_value::<CommentData>(data.clone()) {
            Ok(parsed) => out.push(ProviderComment {
                id: parsed.id,
                body: parsed.body,
                score: parsed.score,
                created_utc: parsed.created_utc as i64,
                parent_id: parsed.parent_id,
            }),
            Err(e) => debug!(error = %e, "skipping comment item that failed validation"),
        }

        if let Some(replies) = data.get("replies") {
            if replies.is_object() {
                flatten_comment_listing(replies, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_post_listing() {
        let value = json!({
            "kind": "Listing",
            "data": {
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "id": "abc",
                            "title": "Hello",
                            "selftext": "body text",
                            "score": 42,
                            "num_comments": 5,
                            "created_utc": 1700000000.0
                        }
                    },
                    // Missing required fields: validated and skipped.
                    { "kind": "t3", "data": { "id": "broken" } },
                    // Non-post children are ignored.
                    { "kind": "t5", "data": {} }
                ]
            }
        });

        let posts = parse_post_listing(&value).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "abc");
        assert_eq!(posts[0].body, "body text");
        assert_eq!(posts[0].score, 42);
        assert_eq!(posts[0].created_utc, 1700000000);
    }

    #[test]
    fn test_parse_post_listing_rejects_bad_envelope() {
        let err = parse_post_listing(&json!({"unexpected": true})).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RedditApi(RedditApiError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_comment_thread_flattens_and_drops_placeholders() {
        let value = json!([
            { "kind": "Listing", "data": { "children": [] } },
            {
                "kind": "Listing",
                "data": {
                    "children": [
                        {
                            "kind": "t1",
                            "data": {
                                "id": "c1",
                                "body": "top level",
                                "score": 3,
                                "created_utc": 1700000000.0,
                                "parent_id": "t3_abc",
                                "replies": {
                                    "kind": "Listing",
                                    "data": {
                                        "children": [
                                            {
                                                "kind": "t1",
                                                "data": {
                                                    "id": "c2",
                                                    "body": "nested reply",
                                                    "score": 1,
                                                    "created_utc": 1700000100.0,
                                                    "parent_id": "t1_c1",
                                                    "replies": ""
                                                }
                                            }
                                        ]
                                    }
                                }
                            }
                        },
                        { "kind": "more", "data": { "count": 12 } }
                    ]
                }
            }
        ]);

        let comments = parse_comment_thread(&value).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[0].parent_id, "t3_abc");
        assert_eq!(comments[1].id, "c2");
        assert_eq!(comments[1].parent_id, "t1_c1");
    }

    #[test]
    fn test_parse_comment_thread_rejects_single_listing() {
        let err = parse_comment_thread(&json!({"kind": "Listing"})).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RedditApi(RedditApiError::MalformedResponse { .. })
        ));
    }
}
