use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A short link owned by the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlRecord {
  #[serde(default)]
  pub id: Option<u64>,
  pub original_url: String,
  pub short_url: String,
  #[serde(default)]
  pub click_count: u64,
  #[serde(deserialize_with = "deserialize_created_date")]
  pub created_date: NaiveDateTime,
  #[serde(default)]
  pub username: Option<String>,
}

/// Click count for a single day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPoint {
  pub click_date: NaiveDate,
  pub count: u64,
}

/// Body of `POST /api/urls/shorten`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
  pub original_url: String,
}

/// Body of `POST /api/auth/public/login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

/// Body of `POST /api/auth/public/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
  pub username: String,
  pub email: String,
  pub password: String,
  pub roles: Vec<String>,
}

impl RegisterRequest {
  /// A sign-up with the default `user` role
  pub fn user(username: &str, email: &str, password: &str) -> Self {
    Self {
      username: username.to_string(),
      email: email.to_string(),
      password: password.to_string(),
      roles: vec!["user".to_string()],
    }
  }
}

/// Response of `POST /api/urls/shorten`. Only the code is relied upon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
  pub short_url: String,
  #[serde(default)]
  pub original_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtResponse {
  pub token: String,
}

/// Accepts `2024-01-01`, `2024-01-01T10:15:30[.fff]` and RFC 3339 timestamps.
fn deserialize_created_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
  D: Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  parse_created_date(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", s)))
}

pub fn parse_created_date(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(dt);
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_utc());
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
}
