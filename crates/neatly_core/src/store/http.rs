//! REST implementation of the remote store contract.
//!
//! # Responsibility
//! - Map each store operation onto one `api/v1` request.
//! - Translate transport failures and error statuses into `StoreError`.
//!
//! # Invariants
//! - Requests are authenticated with `Authorization: Bearer <token>`; a blank
//!   session token fails with `NotAuthenticated` before anything is sent.
//! - HTTP 401 maps to `NotAuthenticated`; any other non-2xx status maps to
//!   `Rejected`.
//! - Create endpoints answer with a JSON location string whose last path
//!   segment is the new id.
//! - `POST notes/{id}/tags` always carries a `label`; attaching an existing
//!   tag sends its id and label together.

use crate::config::ClientConfig;
use crate::model::note::{Note, NoteId, DEFAULT_NOTE_COLOR};
use crate::model::session::Session;
use crate::model::tag::{Tag, TagId};
use crate::store::{RemoteStore, StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const API_PREFIX: &str = "api/v1/";
const TAG_FILTER_KEY: &str = "tag";

/// Shared request plumbing for the REST store and account endpoints.
#[derive(Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub(crate) fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| StoreError::Network(format!("failed to build http client: {err}")))?;
        Self::new(client, config.base_url.as_str())
    }

    pub(crate) fn new(client: Client, base_url: &str) -> StoreResult<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|err| {
            StoreError::Network(format!("invalid base url `{normalized}`: {err}"))
        })?;
        Ok(Self { client, base_url })
    }

    /// Resolves a path relative to `api/v1/`.
    pub(crate) fn url(&self, path: &str) -> StoreResult<Url> {
        self.base_url
            .join(API_PREFIX)
            .and_then(|api| api.join(path))
            .map_err(|err| StoreError::Network(format!("invalid request path `{path}`: {err}")))
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Sends one request and returns the successful response.
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        session: Option<&Session>,
        route: &'static str,
    ) -> StoreResult<Response> {
        let request = match session {
            Some(session) if !session.is_authenticated() => {
                return Err(StoreError::NotAuthenticated);
            }
            Some(session) => request.bearer_auth(session.token()),
            None => request,
        };

        let started_at = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let status = response.status();
        debug!(
            "event=http_request module=store route={route} status={} duration_ms={}",
            status.as_u16(),
            started_at.elapsed().as_millis()
        );

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(StoreError::NotAuthenticated);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&message),
        })
    }
}

/// Decodes a JSON response body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| StoreError::InvalidResponse(err.to_string()))
}

/// Extracts the id from a create response (`"/api/notes/17"` or `17`).
pub(crate) fn parse_created_id(payload: &Value) -> StoreResult<i64> {
    let parsed = match payload {
        Value::Number(number) => number.as_i64(),
        Value::String(location) => location
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<i64>().ok()),
        _ => None,
    };
    parsed.ok_or_else(|| {
        StoreError::InvalidResponse(format!("no id in create response: {payload}"))
    })
}

/// Prefers the `message`/`error` field of a JSON error body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct NotesEnvelope {
    #[serde(default)]
    notes: Option<Vec<Note>>,
}

#[derive(Debug, Deserialize)]
struct TagsEnvelope {
    #[serde(default)]
    tags: Option<Vec<Tag>>,
}

/// Note/tag store backed by the neatly REST API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    transport: HttpTransport,
}

impl HttpRemoteStore {
    /// Builds a store from client configuration (base url and timeout).
    pub fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        Ok(Self {
            transport: HttpTransport::from_config(config)?,
        })
    }

    /// Builds a store around an existing `reqwest` client.
    pub fn with_client(client: Client, base_url: &str) -> StoreResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(client, base_url)?,
        })
    }

    fn url(&self, path: &str) -> StoreResult<Url> {
        self.transport.url(path)
    }

    fn client(&self) -> &Client {
        self.transport.client()
    }

    async fn execute(
        &self,
        session: &Session,
        request: RequestBuilder,
        route: &'static str,
    ) -> StoreResult<Response> {
        self.transport.execute(request, Some(session), route).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn create_note(
        &self,
        session: &Session,
        header: &str,
        body: &str,
    ) -> StoreResult<NoteId> {
        let request = self.client().post(self.url("notes")?).json(&json!({
            "header": header,
            "body": body,
            "color": DEFAULT_NOTE_COLOR,
        }));
        let response = self.execute(session, request, "notes.create").await?;
        parse_created_id(&decode::<Value>(response).await?)
    }

    async fn update_note(
        &self,
        session: &Session,
        note_id: NoteId,
        header: &str,
        body: &str,
    ) -> StoreResult<()> {
        let request = self
            .client()
            .patch(self.url(&format!("notes/{note_id}"))?)
            .json(&json!({ "header": header, "body": body }));
        self.execute(session, request, "notes.update").await?;
        Ok(())
    }

    async fn delete_note(&self, session: &Session, note_id: NoteId) -> StoreResult<()> {
        let request = self.client().delete(self.url(&format!("notes/{note_id}"))?);
        self.execute(session, request, "notes.delete").await?;
        Ok(())
    }

    async fn create_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        label: &str,
    ) -> StoreResult<TagId> {
        let request = self
            .client()
            .post(self.url(&format!("notes/{note_id}/tags"))?)
            .json(&json!({ "label": label }));
        let response = self.execute(session, request, "note_tags.create").await?;
        parse_created_id(&decode::<Value>(response).await?)
    }

    async fn attach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
        label: &str,
    ) -> StoreResult<()> {
        // The backend binds `label` as required and resolves the tag by it.
        let request = self
            .client()
            .post(self.url(&format!("notes/{note_id}/tags"))?)
            .json(&json!({ "id": tag_id, "label": label }));
        self.execute(session, request, "note_tags.attach").await?;
        Ok(())
    }

    async fn detach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
    ) -> StoreResult<()> {
        let request = self
            .client()
            .delete(self.url(&format!("notes/{note_id}/tags/{tag_id}"))?);
        self.execute(session, request, "note_tags.detach").await?;
        Ok(())
    }

    async fn rename_tag(&self, session: &Session, tag_id: TagId, label: &str) -> StoreResult<()> {
        let request = self
            .client()
            .patch(self.url(&format!("tags/{tag_id}"))?)
            .json(&json!({ "label": label }));
        self.execute(session, request, "tags.update").await?;
        Ok(())
    }

    async fn list_tags(&self, session: &Session) -> StoreResult<Vec<Tag>> {
        let request = self.client().get(self.url("tags")?);
        let response = self.execute(session, request, "tags.list").await?;
        let envelope: TagsEnvelope = decode(response).await?;
        Ok(envelope.tags.unwrap_or_default())
    }

    async fn list_notes(&self, session: &Session, tag_filter: &[String]) -> StoreResult<Vec<Note>> {
        let terms: Vec<&str> = tag_filter
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .collect();
        let url = if terms.is_empty() {
            self.url("notes")?
        } else {
            let mut url = self.url("notes/search")?;
            {
                let mut pairs = url.query_pairs_mut();
                for term in &terms {
                    pairs.append_pair(TAG_FILTER_KEY, term);
                }
            }
            url
        };
        let response = self
            .execute(session, self.client().get(url), "notes.list")
            .await?;
        let envelope: NotesEnvelope = decode(response).await?;
        Ok(envelope.notes.unwrap_or_default())
    }

    async fn get_note(&self, session: &Session, note_id: NoteId) -> StoreResult<Note> {
        let request = self.client().get(self.url(&format!("notes/{note_id}"))?);
        let response = self.execute(session, request, "notes.get").await?;
        decode(response).await
    }
}
