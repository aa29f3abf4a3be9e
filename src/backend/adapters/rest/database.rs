//! REST adapter for the structured-database service.

use super::{build_client, check_status, parse_json, transport_error};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::payload::DestinationPayload;
use crate::backend::ports::{TaskBackend, WriteOutcome};
use crate::backend::record::{DatabaseRecord, RawRecord};
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
struct PageListing {
    results: Vec<DatabaseRecord>,
}

#[derive(Debug, Deserialize)]
struct MarkerListing {
    results: Vec<CreatedResponse>,
}

/// Structured-database service adapter.
#[derive(Debug, Clone)]
pub struct DatabaseRestBackend {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl DatabaseRestBackend {
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

#[async_trait]
impl TaskBackend for DatabaseRestBackend {
    fn side(&self) -> SystemSide {
        SystemSide::Database
    }

    async fn fetch(&self, id: &RecordId) -> BackendResult<Option<RawRecord>> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/pages/{id}"))))
            .send()
            .await
            .map_err(transport_error)?;
        let Some(response) = check_status(response).await? else {
            return Ok(None);
        };
        let record: DatabaseRecord = parse_json(response).await?;
        Ok(Some(RawRecord::Database(record)))
    }

    async fn create(&self, payload: &DestinationPayload) -> BackendResult<RecordId> {
        let DestinationPayload::Database(page) = payload else {
            return Err(BackendError::InvalidRecord(
                "tasklist payload sent to the database adapter".to_owned(),
            ));
        };
        let body = json!({
            "properties": page.properties,
            "origin_marker": page.origin.to_string(),
        });
        let response = self
            .authorized(self.client.post(self.url("/pages")))
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
        let DestinationPayload::Database(page) = payload else {
            return Err(BackendError::InvalidRecord(
                "tasklist payload sent to the database adapter".to_owned(),
            ));
        };
        let body = json!({ "properties": page.properties });
        let response = self
            .authorized(self.client.patch(self.url(&format!("/pages/{id}"))))
            .json(&body)
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
            .authorized(self.client.delete(self.url(&format!("/pages/{id}"))))
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
            .authorized(self.client.get(self.url("/pages")))
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
            .authorized(self.client.get(self.url("/pages")))
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
        let listing: PageListing = parse_json(response).await?;
        Ok(listing.results.into_iter().map(RawRecord::Database).collect())
    }
}
