// fanwatch-core/src/platforms/creator/client.rs
//
// Thin reqwest wrapper for the creator platform's JSON API. Every endpoint answers with a
// `{ "success": bool, "response": ... }` envelope; `get_envelope`/`post_envelope` unwrap it
// and record the outcome of each call in the shared HealthAggregator.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::Error;
use crate::health::HealthAggregator;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub response: Option<T>,
    pub error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub details: String,
}

/// Result of an enveloped call. `Missing` covers a 404 or a successful envelope without payload.
pub(crate) enum Fetched<T> {
    Found(T),
    Missing,
}

pub struct CreatorApiClient {
    http: Arc<ReqwestClient>,
    base_url: String,
    auth_token: String,
    user_agent: String,
    health: Arc<HealthAggregator>,
}

impl CreatorApiClient {
    pub fn new(
        base_url: &str,
        auth_token: &str,
        user_agent: &str,
        health: Arc<HealthAggregator>,
    ) -> Result<Self, Error> {
        let http = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http: Arc::new(http),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.to_string(),
            user_agent: user_agent.to_string(),
            health,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health(&self) -> &Arc<HealthAggregator> {
        &self.health
    }

    /// Builds `{base}{path}` with the given query plus the cache-bypass flag.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<url::Url, Error> {
        let mut url = url::Url::parse(&format!("{}{}", self.base_url, path))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("ngsw-bypass", "true");
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", &self.auth_token)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
    }

    pub(crate) async fn get_envelope<T: DeserializeOwned>(&self, url: url::Url) -> Result<Fetched<T>, Error> {
        let req = self.authorize(self.http.get(url.clone()));
        let result = self.execute::<T>(req, &url).await;
        self.health.record_call(result.is_ok());
        result
    }

    pub(crate) async fn post_envelope<T: DeserializeOwned>(
        &self,
        url: url::Url,
        body: &serde_json::Value,
    ) -> Result<Fetched<T>, Error> {
        let req = self.authorize(self.http.post(url.clone()).json(body));
        let result = self.execute::<T>(req, &url).await;
        self.health.record_call(result.is_ok());
        result
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder, url: &url::Url) -> Result<Fetched<T>, Error> {
        trace!("creator api => {}", url.path());
        let resp = req.send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            debug!("creator api {} => 404", url.path());
            return Ok(Fetched::Missing);
        }
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "{}: HTTP {} => {}",
                url.path(),
                status,
                body_text
            )));
        }

        let body = resp.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Upstream(format!("{}: parse error: {}", url.path(), e)))?;

        if !envelope.success {
            return Err(match envelope.error {
                Some(err) => Error::Upstream(format!(
                    "{}: API error (code {}): {}",
                    url.path(),
                    err.code,
                    err.details
                )),
                None => Error::Upstream(format!("{}: request failed without error details", url.path())),
            });
        }

        Ok(match envelope.response {
            Some(v) => Fetched::Found(v),
            None => Fetched::Missing,
        })
    }
}
