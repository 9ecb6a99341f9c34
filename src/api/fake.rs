//! In-memory `ShortLinkApi` used by tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::error::{ApiError, Result};
use super::types::{
  AnalyticsPoint, LoginRequest, RegisterRequest, ShortUrlRecord, ShortenResponse,
};
use super::ShortLinkApi;

#[derive(Debug, Default)]
pub struct Calls {
  pub my_urls: AtomicUsize,
  pub shorten: AtomicUsize,
  pub delete: AtomicUsize,
  pub total_clicks: AtomicUsize,
  pub analytics: AtomicUsize,
  pub login: AtomicUsize,
  pub register: AtomicUsize,
}

impl Calls {
  pub fn get(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }
}

#[derive(Default)]
pub struct FakeApi {
  pub urls: Mutex<Vec<ShortUrlRecord>>,
  pub clicks: Mutex<BTreeMap<NaiveDate, u64>>,
  pub analytics: Mutex<Vec<AnalyticsPoint>>,
  pub tokens: Mutex<Vec<String>>,
  pub ranges: Mutex<Vec<(String, String)>>,
  pub fail_urls: Mutex<bool>,
  pub fail_analytics: Mutex<bool>,
  pub fail_delete: Mutex<bool>,
  pub delay: Mutex<Duration>,
  pub calls: Calls,
}

impl FakeApi {
  pub fn with_urls(urls: Vec<ShortUrlRecord>) -> Self {
    let api = Self::default();
    *api.urls.lock().unwrap() = urls;
    api
  }

  async fn pause(&self, token: &str) {
    self.tokens.lock().unwrap().push(token.to_string());
    let delay = *self.delay.lock().unwrap();
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
  }
}

pub fn record(short_url: &str, created: &str) -> ShortUrlRecord {
  ShortUrlRecord {
    id: None,
    original_url: format!("https://example.com/{}", short_url),
    short_url: short_url.to_string(),
    click_count: 0,
    created_date: super::types::parse_created_date(created).unwrap(),
    username: None,
  }
}

#[async_trait]
impl ShortLinkApi for FakeApi {
  async fn my_urls(&self, token: &str) -> Result<Vec<ShortUrlRecord>> {
    self.calls.my_urls.fetch_add(1, Ordering::SeqCst);
    self.pause(token).await;
    if *self.fail_urls.lock().unwrap() {
      return Err(ApiError::Unauthorized { status: 401 });
    }
    Ok(self.urls.lock().unwrap().clone())
  }

  async fn shorten(&self, token: &str, original_url: &str) -> Result<ShortenResponse> {
    self.calls.shorten.fetch_add(1, Ordering::SeqCst);
    self.pause(token).await;
    let mut urls = self.urls.lock().unwrap();
    let code = format!("c{}", urls.len() + 1);
    urls.push(ShortUrlRecord {
      id: None,
      original_url: original_url.to_string(),
      short_url: code.clone(),
      click_count: 0,
      created_date: chrono::Local::now().naive_local(),
      username: None,
    });
    Ok(ShortenResponse {
      short_url: code,
      original_url: Some(original_url.to_string()),
    })
  }

  async fn delete_url(&self, token: &str, short_url: &str) -> Result<()> {
    self.calls.delete.fetch_add(1, Ordering::SeqCst);
    self.pause(token).await;
    if *self.fail_delete.lock().unwrap() {
      return Err(ApiError::Server {
        status: 500,
        message: "boom".to_string(),
      });
    }
    let mut urls = self.urls.lock().unwrap();
    let before = urls.len();
    urls.retain(|u| u.short_url != short_url);
    if urls.len() == before {
      return Err(ApiError::NotFound {
        resource: short_url.to_string(),
      });
    }
    Ok(())
  }

  async fn total_clicks(
    &self,
    token: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<BTreeMap<NaiveDate, u64>> {
    self.calls.total_clicks.fetch_add(1, Ordering::SeqCst);
    self
      .ranges
      .lock()
      .unwrap()
      .push((start.to_string(), end.to_string()));
    self.pause(token).await;
    Ok(self.clicks.lock().unwrap().clone())
  }

  async fn analytics(
    &self,
    token: &str,
    _short_url: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
  ) -> Result<Vec<AnalyticsPoint>> {
    self.calls.analytics.fetch_add(1, Ordering::SeqCst);
    self
      .ranges
      .lock()
      .unwrap()
      .push((start.to_string(), end.to_string()));
    self.pause(token).await;
    if *self.fail_analytics.lock().unwrap() {
      return Err(ApiError::Unauthorized { status: 401 });
    }
    Ok(self.analytics.lock().unwrap().clone())
  }

  async fn login(&self, request: &LoginRequest) -> Result<String> {
    self.calls.login.fetch_add(1, Ordering::SeqCst);
    if request.password == "secret1" {
      Ok(format!("jwt-for-{}", request.username))
    } else {
      Err(ApiError::Server {
        status: 400,
        message: "Invalid username or password".to_string(),
      })
    }
  }

  async fn register(&self, _request: &RegisterRequest) -> Result<String> {
    self.calls.register.fetch_add(1, Ordering::SeqCst);
    Ok("User register Successfully".to_string())
  }
}
