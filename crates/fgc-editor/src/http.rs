//! `CanvasBackend` over the service's JSON HTTP API.
//!
//! Routes live under `<base_url>/canvas/`. Every request carries the session
//! cookie; the service answers 401 for a missing or foreign session.

use crate::backend::CanvasBackend;
use crate::error::BackendError;
use async_trait::async_trait;
use fgc_core::dto::{self, DeleteSummary, SyncPayload, UpdateStageDto};
use fgc_core::{CanvasNode, NodeId, NodeKind, Stage};
use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where the service lives and which session to act as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpBackendConfig {
    pub base_url: String,
    /// Raw `Cookie` header value, e.g. `connect.sid=...`.
    #[serde(default)]
    pub session_cookie: Option<String>,
}

pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/canvas/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.config.session_cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = check_status(builder.send().await?)?;
        Ok(response.text().await?)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    log::warn!("{} → {status}", response.url().path());
    Err(status_error(status, response.url().path()))
}

fn status_error(status: StatusCode, path: &str) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        StatusCode::NOT_FOUND => BackendError::NotFound(path.to_owned()),
        other => BackendError::Rejected {
            status: other.as_u16(),
        },
    }
}

#[async_trait(?Send)]
impl CanvasBackend for HttpBackend {
    async fn list_stages(&self) -> Result<Vec<Stage>, BackendError> {
        self.send_json(self.request(Method::GET, "stage")).await
    }

    async fn create_stage(&self, stage: &Stage) -> Result<Stage, BackendError> {
        self.send_json(self.request(Method::POST, "stage/create").json(stage))
            .await
    }

    async fn rename_stage(&self, update: &UpdateStageDto) -> Result<Stage, BackendError> {
        self.send_json(self.request(Method::PATCH, "stage/update").json(update))
            .await
    }

    async fn delete_stage(&self, stage_id: NodeId) -> Result<DeleteSummary, BackendError> {
        let path = format!("stage/delete/{stage_id}");
        self.send_json(self.request(Method::DELETE, &path)).await
    }

    async fn load_nodes(
        &self,
        stage_id: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<CanvasNode>, BackendError> {
        let path = format!("{}/get/{stage_id}", kind.route());
        let body = self.send(self.request(Method::GET, &path)).await?;
        Ok(dto::decode_nodes(kind, &body)?)
    }

    async fn create(&self, stage_id: NodeId, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
        let path = format!("{}/create", node.kind().route());
        let body = dto::create_body(stage_id, node)?;
        let text = self.send(self.request(Method::POST, &path).json(&body)).await?;
        Ok(dto::decode_node(node.kind(), &text)?)
    }

    async fn update(&self, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
        let path = format!("{}/update", node.kind().route());
        let body = dto::update_body(node)?;
        let text = self.send(self.request(Method::PATCH, &path).json(&body)).await?;
        Ok(dto::decode_node(node.kind(), &text)?)
    }

    async fn delete(&self, kind: NodeKind, id: NodeId) -> Result<DeleteSummary, BackendError> {
        let path = format!("{}/delete/{id}", kind.route());
        self.send_json(self.request(Method::DELETE, &path)).await
    }

    async fn sync(&self, payload: &SyncPayload) -> Result<(), BackendError> {
        let path = format!("{}/sync", payload.kind().route());
        self.send(self.request(Method::PUT, &path).json(payload))
            .await
            .map(|_| ())
    }
}
