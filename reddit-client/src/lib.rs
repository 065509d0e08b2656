//! Reddit collection pipeline: an authenticated API provider wrapped in
//! compliance guardrails (sliding-window rate limiting, exponential backoff
//! on throttling, and a content-addressed local cache).

pub mod cache;
pub mod client;
pub mod collector;
pub mod provider;
pub mod rate_limiter;

pub use cache::{CacheKind, CacheManager};
pub use client::RedditClient;
pub use collector::Collector;
pub use provider::{ContentProvider, ProviderComment, ProviderPost, RedditProvider};
pub use rate_limiter::RateLimiter;
