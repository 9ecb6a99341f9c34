//! ShortLink REST API: wire types, the async API trait, and its reqwest client.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub use client::HttpApi;
pub use error::{ApiError, Result};
pub use types::{
  AnalyticsPoint, LoginRequest, RegisterRequest, ShortUrlRecord, ShortenResponse,
};

/// The remote operations the dashboard depends on.
///
/// Authenticated calls take the bearer token explicitly. An empty token is
/// still sent (`Authorization: Bearer `); rejecting it is the server's job.
#[async_trait]
pub trait ShortLinkApi: Send + Sync {
  /// `GET /api/urls/myurls`
  async fn my_urls(&self, token: &str) -> Result<Vec<ShortUrlRecord>>;

  /// `POST /api/urls/shorten`
  async fn shorten(&self, token: &str, original_url: &str) -> Result<ShortenResponse>;

  /// `DELETE /api/urls/{short_url}`
  async fn delete_url(&self, token: &str, short_url: &str) -> Result<()>;

  /// `GET /api/urls/totalClicks?startDate&endDate`
  async fn total_clicks(
    &self,
    token: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<BTreeMap<NaiveDate, u64>>;

  /// `GET /api/urls/analytics/{short_url}?startDate&endDate`
  async fn analytics(
    &self,
    token: &str,
    short_url: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
  ) -> Result<Vec<AnalyticsPoint>>;

  /// `POST /api/auth/public/login`, returns the JWT
  async fn login(&self, request: &LoginRequest) -> Result<String>;

  /// `POST /api/auth/public/register`, returns the server's message
  async fn register(&self, request: &RegisterRequest) -> Result<String>;
}
