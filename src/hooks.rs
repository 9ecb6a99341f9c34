//! The named queries and mutations the views are built from.
//!
//! Each `fetch_*` function binds one API call to a cache key, a stale
//! window and a transform. Mutations invalidate the keys they affect.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::api::{
  AnalyticsPoint, LoginRequest, RegisterRequest, ShortLinkApi, ShortUrlRecord, ShortenResponse,
};
use crate::auth::{token_fingerprint, AuthContext, TokenStore};
use crate::config::QueriesConfig;
use crate::query::{Mutation, MutationState, Query, QueryClient, QueryError, QueryKey};

pub const MY_URLS_KEY: &str = "my-shortenurls";
pub const TOTAL_CLICKS_KEY: &str = "url-totalclick";
pub const ANALYTICS_KEY: &str = "analytics-data";

const MIN_PASSWORD_LEN: usize = 6;

pub type MyUrlsQuery = Query<Vec<ShortUrlRecord>>;
pub type TotalClicksQuery = Query<BTreeMap<NaiveDate, u64>, Vec<AnalyticsPoint>>;
pub type AnalyticsQuery = Query<Vec<AnalyticsPoint>>;

/// Everything a query or mutation needs from the rest of the app.
#[derive(Clone)]
pub struct QueryContext {
  pub api: Arc<dyn ShortLinkApi>,
  pub queries: QueryClient,
  pub auth: AuthContext,
  pub token_store: Option<TokenStore>,
  pub stale: QueriesConfig,
}

impl QueryContext {
  pub fn new(api: Arc<dyn ShortLinkApi>, auth: AuthContext, stale: QueriesConfig) -> Self {
    Self {
      api,
      queries: QueryClient::new(),
      auth,
      token_store: None,
      stale,
    }
  }

  pub fn with_token_store(mut self, store: TokenStore) -> Self {
    self.token_store = Some(store);
    self
  }

  /// Forget the token everywhere and drop every cached response.
  pub fn logout(&self) {
    self.auth.set_token(None);
    if let Some(store) = &self.token_store {
      if let Err(e) = store.clear() {
        warn!("{}", e);
      }
    }
    self.queries.clear();
  }
}

fn user_key(name: &str, token: &str) -> QueryKey {
  QueryKey::new([name]).with(token_fingerprint(token))
}

/// Newest first. Links created at the same instant keep their server order.
pub fn sort_by_created_desc(urls: &[ShortUrlRecord]) -> Vec<ShortUrlRecord> {
  let mut sorted = urls.to_vec();
  sorted.sort_by(|a, b| b.created_date.cmp(&a.created_date));
  sorted
}

/// One point per day the server reported, oldest first. Gaps stay gaps.
pub fn clicks_to_points(clicks: &BTreeMap<NaiveDate, u64>) -> Vec<AnalyticsPoint> {
  clicks
    .iter()
    .map(|(date, count)| AnalyticsPoint {
      click_date: *date,
      count: *count,
    })
    .collect()
}

/// January 1 of the year before `today`
pub fn range_start(today: NaiveDate) -> NaiveDate {
  NaiveDate::from_ymd_opt(today.year() - 1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// The current user's links, newest first.
pub fn fetch_my_short_urls(ctx: &QueryContext, token: &str) -> MyUrlsQuery {
  let api = ctx.api.clone();
  let token = token.to_string();
  Query::new(ctx.queries.clone(), user_key(MY_URLS_KEY, &token), move || {
    let api = api.clone();
    let token = token.clone();
    async move { api.my_urls(&token).await.map_err(QueryError::from) }
  })
  .with_stale_time(ctx.stale.my_urls_stale())
  .select(|urls: &Vec<ShortUrlRecord>| sort_by_created_desc(urls))
}

/// Daily click totals across all links since the start of last year.
pub fn fetch_total_clicks(ctx: &QueryContext, token: &str) -> TotalClicksQuery {
  fetch_total_clicks_at(ctx, token, Local::now().date_naive())
}

/// Same as `fetch_total_clicks` with the range ending at `today`.
pub fn fetch_total_clicks_at(ctx: &QueryContext, token: &str, today: NaiveDate) -> TotalClicksQuery {
  let api = ctx.api.clone();
  let token = token.to_string();
  let start = range_start(today);
  Query::new(ctx.queries.clone(), user_key(TOTAL_CLICKS_KEY, &token), move || {
    let api = api.clone();
    let token = token.clone();
    async move {
      api
        .total_clicks(&token, start, today)
        .await
        .map_err(QueryError::from)
    }
  })
  .with_stale_time(ctx.stale.total_clicks_stale())
  .select(clicks_to_points)
}

pub struct FetchAnalyticsConfig {
  pub short_url: String,
  pub token: String,
  pub enabled: bool,
  pub on_error: Option<Box<dyn FnMut(&QueryError) + Send>>,
}

/// Per-link daily clicks. Disabled until a link is selected.
pub fn fetch_analytics_data(ctx: &QueryContext, config: FetchAnalyticsConfig) -> AnalyticsQuery {
  fetch_analytics_data_at(ctx, config, Local::now().naive_local())
}

pub fn fetch_analytics_data_at(
  ctx: &QueryContext,
  config: FetchAnalyticsConfig,
  now: NaiveDateTime,
) -> AnalyticsQuery {
  let FetchAnalyticsConfig {
    short_url,
    token,
    enabled,
    on_error,
  } = config;

  let key = QueryKey::new([ANALYTICS_KEY, short_url.as_str()]).with(token_fingerprint(&token));
  let enabled = enabled && !short_url.is_empty();
  let start = range_start(now.date()).and_time(NaiveTime::MIN);

  let api = ctx.api.clone();
  let query = Query::new(ctx.queries.clone(), key, move || {
    let api = api.clone();
    let token = token.clone();
    let short_url = short_url.clone();
    async move {
      api
        .analytics(&token, &short_url, start, now)
        .await
        .map_err(QueryError::from)
    }
  })
  .with_stale_time(ctx.stale.analytics_stale())
  .with_enabled(enabled);

  match on_error {
    Some(callback) => query.on_error(callback),
    None => query,
  }
}

pub struct DeleteUrlConfig {
  pub token: String,
  pub on_success: Option<Box<dyn FnMut(&str) + Send>>,
  pub on_error: Option<Box<dyn FnMut(&QueryError, &str) + Send>>,
}

/// Deletes a link, then refreshes every cached link list.
pub struct DeleteUrl {
  mutation: Mutation<String, ()>,
}

impl DeleteUrl {
  pub fn new(ctx: &QueryContext, config: DeleteUrlConfig) -> Self {
    let DeleteUrlConfig {
      token,
      on_success,
      on_error,
    } = config;
    let api = ctx.api.clone();
    let queries = ctx.queries.clone();

    let mut mutation = Mutation::new(move |short_url: String| {
      let api = api.clone();
      let queries = queries.clone();
      let token = token.clone();
      async move {
        api
          .delete_url(&token, &short_url)
          .await
          .map_err(QueryError::from)?;
        debug!(%short_url, "deleted short url");
        queries.invalidate(&QueryKey::new([MY_URLS_KEY]));
        Ok::<_, QueryError>(())
      }
    });
    if let Some(mut callback) = on_success {
      mutation = mutation.on_success(move |_, short_url: &String| callback(short_url));
    }
    if let Some(mut callback) = on_error {
      mutation = mutation.on_error(move |e, short_url: &String| callback(e, short_url));
    }

    Self { mutation }
  }

  pub fn mutate(&mut self, short_url: &str) {
    self.mutation.mutate(short_url.to_string());
  }

  pub fn poll(&mut self) -> bool {
    self.mutation.poll()
  }

  pub fn is_pending(&self) -> bool {
    self.mutation.is_pending()
  }

  pub fn state(&self) -> &MutationState<()> {
    self.mutation.state()
  }
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(input: &str) -> Result<Url, QueryError> {
  let invalid = || QueryError::Validation("Enter a valid http(s) URL".to_string());
  let url = Url::parse(input.trim()).map_err(|_| invalid())?;
  match (url.scheme(), url.host_str()) {
    ("http" | "https", Some(host)) if !host.is_empty() => Ok(url),
    _ => Err(invalid()),
  }
}

/// Creates a short link for the given URL.
pub fn shorten_url(ctx: &QueryContext, token: &str) -> Mutation<String, ShortenResponse> {
  let api = ctx.api.clone();
  let queries = ctx.queries.clone();
  let token = token.to_string();
  Mutation::new(move |original_url: String| {
    let api = api.clone();
    let queries = queries.clone();
    let token = token.clone();
    async move {
      let url = validate_url(&original_url)?;
      let created = api
        .shorten(&token, url.as_str())
        .await
        .map_err(QueryError::from)?;
      queries.invalidate(&QueryKey::new([MY_URLS_KEY]));
      Ok::<_, QueryError>(created)
    }
  })
}

fn required(value: &str, field: &str) -> Result<(), QueryError> {
  if value.trim().is_empty() {
    return Err(QueryError::Validation(format!("{} is required", field)));
  }
  Ok(())
}

pub fn validate_login(request: &LoginRequest) -> Result<(), QueryError> {
  required(&request.username, "Username")?;
  required(&request.password, "Password")
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), QueryError> {
  required(&request.username, "Username")?;
  required(&request.email, "Email")?;
  required(&request.password, "Password")?;

  let valid_email = request
    .email
    .split_once('@')
    .map(|(user, domain)| {
      !user.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    })
    .unwrap_or(false);
  if !valid_email {
    return Err(QueryError::Validation("Invalid email address".to_string()));
  }
  if request.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(QueryError::Validation(format!(
      "Password must be at least {} characters",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

/// Logs in and, once the token arrives, stores it in the auth context and
/// on disk.
pub struct Login {
  mutation: Mutation<LoginRequest, String>,
  auth: AuthContext,
  store: Option<TokenStore>,
}

impl Login {
  pub fn new(ctx: &QueryContext) -> Self {
    let api = ctx.api.clone();
    let mutation = Mutation::new(move |request: LoginRequest| {
      let api = api.clone();
      async move {
        validate_login(&request)?;
        api.login(&request).await.map_err(QueryError::from)
      }
    });
    Self {
      mutation,
      auth: ctx.auth.clone(),
      store: ctx.token_store.clone(),
    }
  }

  pub fn mutate(&mut self, request: LoginRequest) {
    self.mutation.mutate(request);
  }

  pub fn is_pending(&self) -> bool {
    self.mutation.is_pending()
  }

  pub fn state(&self) -> &MutationState<String> {
    self.mutation.state()
  }

  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    if !self.mutation.poll() {
      return false;
    }
    if let Some(token) = self.mutation.data() {
      if let Some(store) = &self.store {
        if let Err(e) = store.save(token) {
          warn!("{}", e);
        }
      }
      self.auth.set_token(Some(token.clone()));
    }
    true
  }
}

/// Registers a new account with the default `user` role.
pub fn register(ctx: &QueryContext) -> Mutation<RegisterRequest, String> {
  let api = ctx.api.clone();
  Mutation::new(move |request: RegisterRequest| {
    let api = api.clone();
    async move {
      validate_registration(&request)?;
      api.register(&request).await.map_err(QueryError::from)
    }
  })
}
