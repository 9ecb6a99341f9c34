use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::error::{ApiError, Result};
use super::types::{
  AnalyticsPoint, JwtResponse, LoginRequest, RegisterRequest, ShortUrlRecord, ShortenRequest,
  ShortenResponse,
};
use super::ShortLinkApi;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// reqwest-backed ShortLink API client
#[derive(Debug, Clone)]
pub struct HttpApi {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpApi {
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url = Url::parse(base_url)
      .map_err(|e| ApiError::InvalidInput(format!("invalid API url '{}': {}", base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::InvalidInput(format!(
        "API url '{}' cannot be used as a base",
        base_url
      )));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .build()?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Build an endpoint URL from path segments. Segments are percent-encoded.
  fn endpoint(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidInput("API url cannot be a base".to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
    builder.header(AUTHORIZATION, format!("Bearer {}", token))
  }

  async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}

/// Map non-success statuses onto `ApiError`.
async fn check_status(response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let url = response.url().path().to_string();
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized {
      status: status.as_u16(),
    }),
    StatusCode::NOT_FOUND => Err(ApiError::NotFound { resource: url }),
    _ => {
      let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
      Err(ApiError::Server {
        status: status.as_u16(),
        message,
      })
    }
  }
}

#[async_trait]
impl ShortLinkApi for HttpApi {
  async fn my_urls(&self, token: &str) -> Result<Vec<ShortUrlRecord>> {
    let url = self.endpoint(&["api", "urls", "myurls"])?;
    debug!(%url, "fetching my urls");
    let response = self.authorized(self.client.get(url), token).send().await?;
    self.json(response).await
  }

  async fn shorten(&self, token: &str, original_url: &str) -> Result<ShortenResponse> {
    let url = self.endpoint(&["api", "urls", "shorten"])?;
    let body = ShortenRequest {
      original_url: original_url.to_string(),
    };
    let response = self
      .authorized(self.client.post(url), token)
      .json(&body)
      .send()
      .await?;
    self.json(response).await
  }

  async fn delete_url(&self, token: &str, short_url: &str) -> Result<()> {
    let url = self.endpoint(&["api", "urls", short_url])?;
    debug!(%url, "deleting short url");
    let response = self.authorized(self.client.delete(url), token).send().await?;
    check_status(response).await?;
    Ok(())
  }

  async fn total_clicks(
    &self,
    token: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<BTreeMap<NaiveDate, u64>> {
    let url = self.endpoint(&["api", "urls", "totalClicks"])?;
    let response = self
      .authorized(self.client.get(url), token)
      .query(&[
        ("startDate", start.format(DATE_FORMAT).to_string()),
        ("endDate", end.format(DATE_FORMAT).to_string()),
      ])
      .send()
      .await?;
    self.json(response).await
  }

  async fn analytics(
    &self,
    token: &str,
    short_url: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
  ) -> Result<Vec<AnalyticsPoint>> {
    let url = self.endpoint(&["api", "urls", "analytics", short_url])?;
    let response = self
      .authorized(self.client.get(url), token)
      .query(&[
        ("startDate", start.format(DATE_TIME_FORMAT).to_string()),
        ("endDate", end.format(DATE_TIME_FORMAT).to_string()),
      ])
      .send()
      .await?;
    self.json(response).await
  }

  async fn login(&self, request: &LoginRequest) -> Result<String> {
    let url = self.endpoint(&["api", "auth", "public", "login"])?;
    let response = self.client.post(url).json(request).send().await?;
    let jwt: JwtResponse = self.json(response).await?;
    Ok(jwt.token)
  }

  async fn register(&self, request: &RegisterRequest) -> Result<String> {
    let url = self.endpoint(&["api", "auth", "public", "register"])?;
    let response = self.client.post(url).json(request).send().await?;
    let response = check_status(response).await?;
    Ok(response.text().await?)
  }
}
