//! HTTP implementation of the remote authority contract.

use crate::types::RefreshRequest;
use crate::{AuthGrant, Credentials, RefreshGrant, RemoteAuthority, RemoteError, RemoteResult};
use async_trait::async_trait;
use entity_store::{
    NewNote, NewSection, NewTag, Note, NoteId, NotePatch, Section, SectionId, SectionPatch, Tag,
    TagId, TagPatch,
};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Error bodies can echo credentials back; log only their length and digest.
fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// reqwest-backed [`RemoteAuthority`].
pub struct HttpRemoteAuthority {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: RwLock<Option<String>>,
}

impl HttpRemoteAuthority {
    /// Create a client for the server at `base_url`; every request times out
    /// after `timeout`.
    pub fn new(mut base_url: Url, timeout: Duration) -> RemoteResult<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::from_transport)?;

        Ok(Self {
            http_client,
            base_url,
            access_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a bearer token is currently installed.
    pub fn has_access_token(&self) -> bool {
        self.access_token.read().is_some()
    }

    fn url(&self, path: &str) -> RemoteResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn request(&self, method: Method, path: &str) -> RemoteResult<RequestBuilder> {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "Remote request");

        let mut builder = self
            .http_client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = self.access_token.read().as_deref() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = builder.send().await.map_err(RemoteError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            debug!(status = %status, body_summary = %body_summary, "Remote request rejected");
            return Err(RemoteError::from_status(
                status.as_u16(),
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            ));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        response.json().await.map_err(RemoteError::from_transport)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RemoteResult<T> {
        let response = self.send(self.request(method, path)?.json(body)).await?;
        response.json().await.map_err(RemoteError::from_transport)
    }

    async fn send_empty(&self, method: Method, path: &str) -> RemoteResult<()> {
        self.send(self.request(method, path)?).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemoteAuthority {
    fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    async fn register(&self, credentials: &Credentials) -> RemoteResult<AuthGrant> {
        self.send_json(Method::POST, "auth/register/", credentials)
            .await
    }

    async fn login(&self, credentials: &Credentials) -> RemoteResult<AuthGrant> {
        self.send_json(Method::POST, "auth/login/", credentials).await
    }

    async fn logout(&self) -> RemoteResult<()> {
        self.send_empty(Method::POST, "auth/logout/").await
    }

    async fn refresh(&self, refresh_token: &str) -> RemoteResult<RefreshGrant> {
        let body = RefreshRequest {
            refresh: refresh_token,
        };
        self.send_json(Method::POST, "auth/token/refresh/", &body)
            .await
    }

    async fn health(&self) -> RemoteResult<()> {
        self.send_empty(Method::GET, "health/").await
    }

    async fn fetch_sections(&self) -> RemoteResult<Vec<Section>> {
        self.get_json("api/section/").await
    }

    async fn create_section(&self, draft: &NewSection) -> RemoteResult<Section> {
        self.send_json(Method::POST, "api/section/", draft).await
    }

    async fn update_section(&self, id: SectionId, patch: &SectionPatch) -> RemoteResult<Section> {
        self.send_json(Method::PUT, &format!("api/section/{}/", id), patch)
            .await
    }

    async fn delete_section(&self, id: SectionId) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &format!("api/section/{}/", id))
            .await
    }

    async fn fetch_tags(&self, section: SectionId) -> RemoteResult<Vec<Tag>> {
        self.get_json(&format!("api/tag/{}/", section)).await
    }

    async fn create_tag(&self, draft: &NewTag) -> RemoteResult<Tag> {
        self.send_json(Method::POST, "api/tag/", draft).await
    }

    async fn update_tag(&self, id: TagId, patch: &TagPatch) -> RemoteResult<Tag> {
        self.send_json(Method::PUT, &format!("api/tag/{}/", id), patch)
            .await
    }

    async fn delete_tag(&self, id: TagId) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &format!("api/tag/{}/", id))
            .await
    }

    async fn fetch_notes(&self, section: SectionId) -> RemoteResult<Vec<Note>> {
        self.get_json(&format!("api/note/{}/", section)).await
    }

    async fn create_note(&self, draft: &NewNote) -> RemoteResult<Note> {
        self.send_json(Method::POST, "api/note/", draft).await
    }

    async fn update_note(&self, id: NoteId, patch: &NotePatch) -> RemoteResult<Note> {
        self.send_json(Method::PUT, &format!("api/note/{}/", id), patch)
            .await
    }

    async fn delete_note(&self, id: NoteId) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &format!("api/note/{}/", id))
            .await
    }
}
