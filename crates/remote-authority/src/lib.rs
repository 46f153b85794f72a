//! Remote authority client.
//!
//! [`RemoteAuthority`] is the request/response contract the engine talks to.
//! [`HttpRemoteAuthority`] implements it over HTTP with a single installable
//! bearer token; tests substitute scripted implementations.

mod error;
mod http;
mod types;

pub use error::{RemoteError, RemoteResult};
pub use http::HttpRemoteAuthority;
pub use types::{AuthGrant, Credentials, RefreshGrant, UserIdentity};

use async_trait::async_trait;
use entity_store::{
    NewNote, NewSection, NewTag, Note, NoteId, NotePatch, Section, SectionId, SectionPatch, Tag,
    TagId, TagPatch,
};

/// Request/response contract of the notebook server.
///
/// Entity calls rely on the token installed with [`set_access_token`]; keeping
/// it fresh is the caller's job.
///
/// [`set_access_token`]: RemoteAuthority::set_access_token
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Install (or clear) the bearer token sent with every subsequent request.
    fn set_access_token(&self, token: Option<String>);

    // Auth
    async fn register(&self, credentials: &Credentials) -> RemoteResult<AuthGrant>;
    async fn login(&self, credentials: &Credentials) -> RemoteResult<AuthGrant>;
    async fn logout(&self) -> RemoteResult<()>;
    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> RemoteResult<RefreshGrant>;
    async fn health(&self) -> RemoteResult<()>;

    // Sections
    async fn fetch_sections(&self) -> RemoteResult<Vec<Section>>;
    async fn create_section(&self, draft: &NewSection) -> RemoteResult<Section>;
    async fn update_section(&self, id: SectionId, patch: &SectionPatch) -> RemoteResult<Section>;
    async fn delete_section(&self, id: SectionId) -> RemoteResult<()>;

    // Tags
    async fn fetch_tags(&self, section: SectionId) -> RemoteResult<Vec<Tag>>;
    async fn create_tag(&self, draft: &NewTag) -> RemoteResult<Tag>;
    async fn update_tag(&self, id: TagId, patch: &TagPatch) -> RemoteResult<Tag>;
    async fn delete_tag(&self, id: TagId) -> RemoteResult<()>;

    // Notes
    async fn fetch_notes(&self, section: SectionId) -> RemoteResult<Vec<Note>>;
    async fn create_note(&self, draft: &NewNote) -> RemoteResult<Note>;
    async fn update_note(&self, id: NoteId, patch: &NotePatch) -> RemoteResult<Note>;
    async fn delete_note(&self, id: NoteId) -> RemoteResult<()>;
}
