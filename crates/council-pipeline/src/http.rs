//! HTTP adapter for the evaluation backend.
//!
//! Every stage is a JSON `POST` to `{base_url}/api/evaluate/stage{n}`.
//! A non-success status fails the stage without reading the body; a
//! success status with an undecodable body is a validation failure.

use async_trait::async_trait;
use council_core::{
    BackendConfig, CoreError, HealthStatus, Stage, Stage1Request, Stage1Response, Stage2Request,
    Stage2Response, Stage3Request, Stage3Response,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::client::StageClient;
use crate::error::StageError;

/// Backend client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStageClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStageClient {
    /// Creates a client from backend configuration.
    pub fn new(config: &BackendConfig) -> council_core::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The backend base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Queries the backend health endpoint (`GET /`).
    pub async fn health(&self) -> Result<HealthStatus, reqwest::Error> {
        self.client
            .get(self.url("/"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn post<Req, Resp>(&self, stage: Stage, body: &Req) -> Result<Resp, StageError>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url(stage.path());
        debug!(%stage, %url, "sending stage request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| StageError::transport(stage, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::transport(
                stage,
                format!("backend returned HTTP {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::transport(stage, describe(&e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| StageError::validation(stage, format!("malformed response body: {e}")))
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("could not connect to backend: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl StageClient for HttpStageClient {
    async fn collect(&self, request: &Stage1Request) -> Result<Stage1Response, StageError> {
        self.post(Stage::Collect, request).await
    }

    async fn evaluate(&self, request: &Stage2Request) -> Result<Stage2Response, StageError> {
        self.post(Stage::Evaluate, request).await
    }

    async fn scoreboard(&self, request: &Stage3Request) -> Result<Stage3Response, StageError> {
        self.post(Stage::Scoreboard, request).await
    }
}
