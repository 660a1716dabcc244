//! API client for communicating with the risk service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use risk_core::PredictionResult;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the risk service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Score one booking on the service
    pub async fn predict(&self, booking: &serde_json::Value) -> Result<RemotePrediction> {
        self.post("v1/predict", booking).await
    }

    pub async fn model(&self) -> Result<RemoteModel> {
        self.get("v1/model").await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context("Failed to parse response");
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(error) => match error.field {
                Some(field) => anyhow::bail!("{} (field `{}`, {})", error.message, field, status),
                None => anyhow::bail!("{} ({})", error.message, status),
            },
            Err(_) => anyhow::bail!("API error ({}): {}", status, body),
        }
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePrediction {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteModel {
    pub model_version: String,
    pub format: String,
    pub checksum: String,
    pub feature_count: usize,
    pub policy: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    field: Option<String>,
}
