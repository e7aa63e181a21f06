//! HTTP client for a hosted entity API.
//!
//! Collections live under `{base}/{Kind}` (`StudyTask`, `StudySession`,
//! `StudyGoal`); records under `{base}/{Kind}/{id}`. Listing passes the
//! order field through as `sort`, so ordering is the server's.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{decode, Entity, EntityKind, EntityStore};
use crate::error::StoreError;

/// Entity API client.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl RemoteStore {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed or cannot carry a path.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, StoreError> {
        let base = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(format!("{base_url} cannot be a base URL")));
        }
        Ok(Self {
            client: Client::new(),
            base,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self, kind: EntityKind, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push(kind.api_name());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Send a request and return the decoded JSON body, or `None` on 404.
    async fn send(&self, kind: EntityKind, request: RequestBuilder) -> Result<Option<Value>, StoreError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Decode { kind, source })
    }

    fn not_found(kind: EntityKind, id: &str) -> StoreError {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl EntityStore for RemoteStore {
    async fn list<E: Entity>(
        &self,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<Vec<E>, StoreError> {
        let mut query = vec![("sort", order_by.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let url = self.endpoint(E::KIND, None)?;
        let body = self
            .send(E::KIND, self.client.get(url).query(&query))
            .await?
            .unwrap_or(Value::Array(Vec::new()));
        let items = match body {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        debug!(kind = %E::KIND, count = items.len(), "records listed");
        items.into_iter().map(decode::<E>).collect()
    }

    async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        let url = self.endpoint(E::KIND, Some(id))?;
        match self.send(E::KIND, self.client.get(url)).await? {
            Some(Value::Null) | None => Ok(None),
            Some(doc) => decode::<E>(doc).map(Some),
        }
    }

    async fn create<E: Entity>(&self, fields: Value) -> Result<E, StoreError> {
        if !fields.is_object() {
            return Err(StoreError::InvalidFields { kind: E::KIND });
        }
        let url = self.endpoint(E::KIND, None)?;
        let doc = self
            .send(E::KIND, self.client.post(url).json(&fields))
            .await?
            .ok_or_else(|| StoreError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                body: format!("collection {} not found", E::KIND.api_name()),
            })?;
        decode::<E>(doc)
    }

    async fn update<E: Entity>(&self, id: &str, fields: Value) -> Result<E, StoreError> {
        if !fields.is_object() {
            return Err(StoreError::InvalidFields { kind: E::KIND });
        }
        let url = self.endpoint(E::KIND, Some(id))?;
        let doc = self
            .send(E::KIND, self.client.put(url).json(&fields))
            .await?
            .ok_or_else(|| Self::not_found(E::KIND, id))?;
        decode::<E>(doc)
    }

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError> {
        let url = self.endpoint(E::KIND, Some(id))?;
        self.send(E::KIND, self.client.delete(url))
            .await?
            .ok_or_else(|| Self::not_found(E::KIND, id))?;
        Ok(())
    }
}
