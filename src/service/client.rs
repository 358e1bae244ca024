use color_eyre::{eyre::eyre, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, RwLock};
use url::Url;

use crate::config::Config;
use crate::session::Role;

use super::api_types::{ApiError, ApiProfile, ApiSignupResponse, ApiTokenResponse};
use super::Entity;

/// Credentials obtained from a successful authentication exchange.
#[derive(Debug, Clone)]
pub struct AuthSession {
  pub access_token: String,
  pub user_id: String,
  pub email: String,
}

/// HTTP client for the data service.
///
/// Reads and writes go through the row API (`rest/v1/{table}`); sign-in and
/// sign-up through the auth API (`auth/v1/...`). Requests carry the project
/// api key, plus the user's access token as bearer once signed in.
#[derive(Clone)]
pub struct ServiceClient {
  http: reqwest::Client,
  base: Url,
  api_key: String,
  token: Arc<RwLock<Option<String>>>,
}

impl ServiceClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut raw = config.service.url.clone();
    // Url::join treats the last path segment as a file without this.
    if !raw.ends_with('/') {
      raw.push('/');
    }
    let base =
      Url::parse(&raw).map_err(|e| eyre!("invalid service url '{}': {}", config.service.url, e))?;

    let api_key = config.service.resolve_api_key()?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("r9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("failed to build http client: {}", e))?;

    Ok(Self {
      http,
      base,
      api_key,
      token: Arc::new(RwLock::new(None)),
    })
  }

  /// Host portion of the service URL, for the header bar.
  pub fn host(&self) -> &str {
    self.base.host_str().unwrap_or("service")
  }

  /// Install or clear the signed-in user's access token. Shared across all
  /// clones of this client.
  pub fn set_access_token(&self, token: Option<String>) {
    *self.token.write().expect("token lock poisoned") = token;
  }

  fn bearer(&self) -> String {
    self
      .token
      .read()
      .expect("token lock poisoned")
      .clone()
      .unwrap_or_else(|| self.api_key.clone())
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("invalid endpoint '{}': {}", path, e))
  }

  fn table_url<E: Entity>(&self) -> Result<Url> {
    let mut url = self.endpoint(&format!("rest/v1/{}", E::TABLE))?;
    url.query_pairs_mut().append_pair("select", E::SELECT);
    Ok(url)
  }

  /// List all rows of an entity, server-side sorted, joins resolved.
  pub async fn list<E: Entity>(&self) -> Result<Vec<E>> {
    let mut url = self.table_url::<E>()?;
    url
      .query_pairs_mut()
      .append_pair("order", &E::ORDER.to_query());

    let resp = self
      .http
      .get(url)
      .header("apikey", &self.api_key)
      .bearer_auth(self.bearer())
      .send()
      .await
      .map_err(|e| eyre!("failed to list {}: {}", E::TABLE, e))?;

    read_json(resp).await
  }

  /// Insert one row, returning the created row as the service sees it.
  pub async fn insert<E: Entity, P: Serialize>(&self, payload: &P) -> Result<E> {
    let url = self.table_url::<E>()?;

    let resp = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .header("Prefer", "return=representation")
      .bearer_auth(self.bearer())
      .json(payload)
      .send()
      .await
      .map_err(|e| eyre!("failed to insert into {}: {}", E::TABLE, e))?;

    let rows: Vec<E> = read_json(resp).await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("service returned no row for insert into {}", E::TABLE))
  }

  /// Update one row by id, returning the updated row.
  pub async fn update<E: Entity, P: Serialize>(&self, id: &str, payload: &P) -> Result<E> {
    let mut url = self.table_url::<E>()?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let resp = self
      .http
      .patch(url)
      .header("apikey", &self.api_key)
      .header("Prefer", "return=representation")
      .bearer_auth(self.bearer())
      .json(payload)
      .send()
      .await
      .map_err(|e| eyre!("failed to update {} {}: {}", E::TABLE, id, e))?;

    let rows: Vec<E> = read_json(resp).await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("no {} row with id {}", E::TABLE, id))
  }

  /// Exchange email + password for a session.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
    let mut url = self.endpoint("auth/v1/token")?;
    url
      .query_pairs_mut()
      .append_pair("grant_type", "password");

    let resp = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .map_err(|e| eyre!("sign-in request failed: {}", e))?;

    let token: ApiTokenResponse = read_json(resp).await?;
    Ok(AuthSession {
      access_token: token.access_token,
      email: token.user.email.unwrap_or_else(|| email.to_string()),
      user_id: token.user.id,
    })
  }

  /// Create an account. Returns a session when the service signs the user in
  /// directly; otherwise the caller follows up with `sign_in`.
  pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
    let url = self.endpoint("auth/v1/signup")?;

    let resp = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .map_err(|e| eyre!("sign-up request failed: {}", e))?;

    let signup: ApiSignupResponse = read_json(resp).await?;
    let user_id = signup
      .user_id()
      .ok_or_else(|| eyre!("no user id returned from signup"))?
      .to_string();

    Ok(signup.access_token.map(|access_token| AuthSession {
      access_token,
      user_id,
      email: email.to_string(),
    }))
  }

  /// Read the role from the profile row keyed by user id.
  pub async fn fetch_role(&self, user_id: &str) -> Result<Role> {
    let mut url = self.endpoint("rest/v1/profiles")?;
    url
      .query_pairs_mut()
      .append_pair("select", "role")
      .append_pair("id", &format!("eq.{}", user_id));

    let resp = self
      .http
      .get(url)
      .header("apikey", &self.api_key)
      .bearer_auth(self.bearer())
      .send()
      .await
      .map_err(|e| eyre!("failed to fetch profile: {}", e))?;

    let profiles: Vec<ApiProfile> = read_json(resp).await?;
    profiles
      .into_iter()
      .next()
      .map(|p| p.role)
      .ok_or_else(|| eyre!("no profile found for user {}", user_id))
  }

  /// Insert the profile row at sign-up time.
  pub async fn create_profile(&self, user_id: &str, email: &str, role: Role) -> Result<()> {
    let url = self.endpoint("rest/v1/profiles")?;
    let username = email.split('@').next().unwrap_or(email);

    let resp = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .bearer_auth(self.bearer())
      .json(&json!({
        "id": user_id,
        "email": email,
        "role": role,
        "username": username,
      }))
      .send()
      .await
      .map_err(|e| eyre!("failed to create profile: {}", e))?;

    let status = resp.status();
    if status.is_success() {
      Ok(())
    } else {
      let body = resp.text().await.unwrap_or_default();
      Err(eyre!("{}", ApiError::describe(&body, status)))
    }
  }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(eyre!("{}", ApiError::describe(&body, status)));
  }

  resp
    .json()
    .await
    .map_err(|e| eyre!("failed to parse service response: {}", e))
}
