use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::http::{Envelope, ACTION_GET_NOTIFICATIONS, ACTION_MARK_AS_READ};

/// The two calls the runtime makes against the service.
#[async_trait]
pub trait TrayTransport: Send + Sync {
    /// Raw fragment markup; empty when there is nothing to show.
    async fn fetch_fragment(&self) -> Result<String>;

    async fn acknowledge(&self, id: i64) -> Result<()>;
}

#[derive(Deserialize)]
struct NonceBootstrap {
    ajax_url: String,
    nonce: String,
}

/// HTTP transport keeping the guest session cookie between calls.
pub struct HttpTransport {
    http: reqwest::Client,
    ajax_url: Url,
    nonce: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub async fn connect(base_url: &Url, bearer_token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;

        let mut request = http.get(base_url.join("ajax/nonce")?);
        if let Some(token) = &bearer_token {
            request = request.bearer_auth(token);
        }
        let bootstrap: NonceBootstrap = request
            .send()
            .await
            .context("failed to reach notification service")?
            .error_for_status()?
            .json()
            .await
            .context("invalid nonce bootstrap response")?;

        let ajax_url = base_url.join(bootstrap.ajax_url.trim_start_matches('/'))?;
        tracing::debug!(ajax_url = %ajax_url, "notification transport ready");

        Ok(Self {
            http,
            ajax_url,
            nonce: bootstrap.nonce,
            bearer_token,
        })
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut request = self.http.post(self.ajax_url.clone()).form(form);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl TrayTransport for HttpTransport {
    async fn fetch_fragment(&self) -> Result<String> {
        let response = self
            .post(&[("action", ACTION_GET_NOTIFICATIONS), ("nonce", self.nonce.as_str())])
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }
        Err(anyhow!(
            "failed to fetch notifications ({}): {}",
            status,
            failure_message(&body)
        ))
    }

    async fn acknowledge(&self, id: i64) -> Result<()> {
        let id = id.to_string();
        let response = self
            .post(&[
                ("action", ACTION_MARK_AS_READ),
                ("nonce", self.nonce.as_str()),
                ("notification_id", id.as_str()),
            ])
            .await?;
        let body = response.text().await?;

        let envelope: Envelope =
            serde_json::from_str(&body).context("invalid acknowledgement response")?;
        if envelope.success {
            Ok(())
        } else {
            Err(anyhow!(envelope.data.message))
        }
    }
}

fn failure_message(body: &str) -> String {
    serde_json::from_str::<Envelope>(body)
        .map(|envelope| envelope.data.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
