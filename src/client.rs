use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ExportConfig;
use crate::error::{ApiError, status_error};
use crate::models::{Credentials, LoginReply, Session, Station, UserInfo};
use crate::util::urljoin;
use crate::window::HistoryWindow;

/// Blocking client for the WeatherXM REST API.
///
/// Every call is issued on the calling thread, one at a time.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    http: HttpClient,
}

impl Client {
    pub fn new(cfg: &ExportConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wxm-export/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("wxm-export")),
        );
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = HttpClient::builder().default_headers(default_headers);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url.clone(),
            http,
        })
    }

    /// Logs in and returns the bearer token for the rest of the run.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let url = urljoin(&self.url, "/auth/login");
        let reply: Value = self.api_json(self.http.post(&url).json(credentials), &url)?;
        let login: LoginReply =
            serde_json::from_value(reply).map_err(|_| ApiError::MissingField {
                url: url.clone(),
                field: "token",
            })?;
        debug!("authenticated");
        Ok(Session::new(login.token))
    }

    /// Resolves the id of the account the session belongs to.
    #[instrument(skip_all)]
    pub fn current_user(&self, session: &Session) -> Result<String, ApiError> {
        let url = urljoin(&self.url, "/me");
        let info: UserInfo = self.api_json(self.authed_get(&url, session), &url)?;
        let id = info
            .id()
            .ok_or(ApiError::MissingField { url, field: "id" })?;
        debug!(user_id = %id, "resolved current user");
        Ok(id)
    }

    /// Lists the account's stations, keeping only `id`, `name` and `location`.
    ///
    /// An account without stations is an error rather than an empty export.
    #[instrument(skip_all)]
    pub fn stations(&self, session: &Session) -> Result<Vec<Station>, ApiError> {
        let url = urljoin(&self.url, "/me/devices");
        let stations: Vec<Station> = self.api_json(self.authed_get(&url, session), &url)?;
        if stations.is_empty() {
            return Err(ApiError::EmptyStationList);
        }
        debug!(count = stations.len(), "listed stations");
        Ok(stations)
    }

    /// Fetches the raw history document for one station over `window`.
    #[instrument(skip(self, session, window), fields(from = %window.from, to = %window.to))]
    pub fn history(
        &self,
        session: &Session,
        station_id: &str,
        window: &HistoryWindow,
    ) -> Result<Value, ApiError> {
        let url = urljoin(&self.url, &format!("/me/devices/{station_id}/history"));
        let req = self.authed_get(&url, session).query(&window.query());
        self.api_json(req, &url)
    }

    fn authed_get(&self, url: &str, session: &Session) -> RequestBuilder {
        self.http.get(url).bearer_auth(session.token())
    }

    fn api_json<TResp: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
    ) -> Result<TResp, ApiError> {
        let resp = req.send().map_err(|source| ApiError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if status != StatusCode::OK {
            return Err(status_error(status, url, &text));
        }

        serde_json::from_str::<TResp>(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
