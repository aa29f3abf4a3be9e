//! REST adapter for the task-list service.

use super::{build_client, check_status, parse_json, transport_error};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::payload::{DestinationPayload, TasklistPayload};
use crate::backend::ports::{TaskBackend, WriteOutcome};
use crate::backend::record::{RawRecord, TasklistRecord};
use crate::identity::{RecordId, RecordIdentity, SystemSide};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TaskListing {
    results: Vec<TasklistRecord>,
}

#[derive(Debug, Deserialize)]
struct MarkerListing {
    results: Vec<CreatedResponse>,
}

/// Task-list service adapter.
#[derive(Debug, Clone)]
pub struct TasklistRestBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TasklistRestBackend {
    /// Creates an adapter against the given API root.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> BackendResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

fn task_body(task: &TasklistPayload) -> serde_json::Value {
    json!({
        "content": task.content,
        "description": task.description,
        "due_date": task.due_date,
        "due_string": task.due_string,
        "priority": task.priority,
        "project": task.project,
        "labels": task.labels,
        "parent_id": task.parent_id,
        "completed": task.completed,
    })
}

#[async_trait]
impl TaskBackend for TasklistRestBackend {
    fn side(&self) -> SystemSide {
        SystemSide::Tasklist
    }

    async fn fetch(&self, id: &RecordId) -> BackendResult<Option<RawRecord>> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/tasks/{id}"))))
            .send()
            .await
            .map_err(transport_error)?;
        let Some(response) = check_status(response).await? else {
            return Ok(None);
        };
        let record: TasklistRecord = parse_json(response).await?;
        Ok(Some(RawRecord::Tasklist(record)))
    }

    async fn create(&self, payload: &DestinationPayload) -> BackendResult<RecordId> {
        let DestinationPayload::Tasklist(task) = payload else {
            return Err(BackendError::InvalidRecord(
                "database payload sent to the tasklist adapter".to_owned(),
            ));
        };
        let mut body = task_body(task);
        if let Some(map) = body.as_object_mut() {
            map.insert(
                "origin_marker".to_owned(),
                serde_json::Value::String(task.origin.to_string()),
            );
        }
        let response = self
            .authorized(self.client.post(self.url("/tasks")))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?.ok_or_else(|| {
            BackendError::Rejected {
                status: 404,
                reason: "create endpoint not found".to_owned(),
            }
        })?;
        let created: CreatedResponse = parse_json(response).await?;
        Ok(RecordId::new(created.id))
    }

    async fn update(
        &self,
        id: &RecordId,
        payload: &DestinationPayload,
    ) -> BackendResult<WriteOutcome> {
        let DestinationPayload::Tasklist(task) = payload else {
            return Err(BackendError::InvalidRecord(
                "database payload sent to the tasklist adapter".to_owned(),
            ));
        };
        let response = self
            .authorized(self.client.patch(self.url(&format!("/tasks/{id}"))))
            .json(&task_body(task))
            .send()
            .await
            .map_err(transport_error)?;
        match check_status(response).await? {
            Some(_) => Ok(WriteOutcome::Applied),
            None => Ok(WriteOutcome::NotFound),
        }
    }

    async fn delete(&self, id: &RecordId) -> BackendResult<WriteOutcome> {
        let response = self
            .authorized(self.client.delete(self.url(&format!("/tasks/{id}"))))
            .send()
            .await
            .map_err(transport_error)?;
        match check_status(response).await? {
            Some(_) => Ok(WriteOutcome::Applied),
            None => Ok(WriteOutcome::NotFound),
        }
    }

    async fn find_by_origin(&self, origin: &RecordIdentity) -> BackendResult<Option<RecordId>> {
        let response = self
            .authorized(self.client.get(self.url("/tasks")))
            .query(&[("origin_marker", origin.to_string())])
            .send()
            .await
            .map_err(transport_error)?;
        let Some(response) = check_status(response).await? else {
            return Ok(None);
        };
        let listing: MarkerListing = parse_json(response).await?;
        Ok(listing.results.into_iter().next().map(|hit| RecordId::new(hit.id)))
    }

    async fn changed_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> BackendResult<Vec<RawRecord>> {
        let response = self
            .authorized(self.client.get(self.url("/tasks")))
            .query(&[
                ("changed_since", since.to_rfc3339()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let Some(response) = check_status(response).await? else {
            return Ok(Vec::new());
        };
        let listing: TaskListing = parse_json(response).await?;
        Ok(listing.results.into_iter().map(RawRecord::Tasklist).collect())
    }
}
