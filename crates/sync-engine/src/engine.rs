//! Engine facade: owns the collaborators and routes intents.

use crate::coordinator::FetchTracker;
use crate::error::{EngineError, ErrorSignal};
use crate::filter::FilterEngine;
use crate::health;
use crate::intent::Intent;
use crate::relations::{Asymmetry, RelationMaintainer};
use crate::state::EngineState;
use crate::status::{StatusReporter, SyncStatus};
use crate::throttle::{FieldThrottle, ThrottleWindows};
use crate::view::{NoteTags, SectionView, SessionView};
use entity_store::{NoteId, SectionId, StoreTree, Tag};
use notebook_config_and_utils::Config;
use notebook_storage::StateVault;
use remote_authority::RemoteAuthority;
use session_guard::{AuthStateChangedPayload, SessionGuard, SessionPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing knobs of the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub title_throttle: Duration,
    pub content_throttle: Duration,
    /// Tag labels and section names.
    pub label_throttle: Duration,
    pub health_poll_interval: Duration,
    pub health_retry_delay: Duration,
    pub health_max_retries: u32,
    pub session: SessionPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title_throttle: config.title_throttle(),
            content_throttle: config.content_throttle(),
            label_throttle: config.label_throttle(),
            health_poll_interval: config.health_poll_interval(),
            health_retry_delay: config.health_retry_delay(),
            health_max_retries: config.health_max_retries,
            session: SessionPolicy::from_config(config),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub(crate) struct EngineInner {
    pub(crate) remote: Arc<dyn RemoteAuthority>,
    pub(crate) guard: SessionGuard,
    pub(crate) state: Arc<EngineState>,
    pub(crate) status: StatusReporter,
    pub(crate) throttle: Arc<FieldThrottle>,
    pub(crate) fetches: FetchTracker,
    /// Serializes structural tag changes so none is lost to a concurrent one.
    pub(crate) structural: tokio::sync::Mutex<()>,
    /// Serializes tag creation so the label uniqueness check holds until commit.
    pub(crate) tag_creation: tokio::sync::Mutex<()>,
    pub(crate) settings: EngineSettings,
}

/// The optimistic mutation and reconciliation engine.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Build an engine over `remote`, restoring the session and the store
    /// tree persisted in `vault`.
    pub fn new(
        remote: Arc<dyn RemoteAuthority>,
        vault: StateVault,
        settings: EngineSettings,
    ) -> Self {
        let state = Arc::new(EngineState::restore(vault.clone()));
        let throttle = Arc::new(FieldThrottle::new(ThrottleWindows {
            title: settings.title_throttle,
            content: settings.content_throttle,
            label: settings.label_throttle,
        }));

        let guard = SessionGuard::new(remote.clone(), vault, settings.session);
        {
            let state = state.clone();
            let throttle = throttle.clone();
            guard.set_reset_hook(Box::new(move || {
                throttle.clear();
                state.reset();
            }));
        }
        guard.set_state_callback(Box::new(|payload: AuthStateChangedPayload| {
            debug!(state = ?payload.state, username = ?payload.username, "Session state changed");
        }));

        info!(
            authenticated = guard.is_authenticated(),
            "Sync engine initialized"
        );

        Self {
            inner: Arc::new(EngineInner {
                remote,
                guard,
                state,
                status: StatusReporter::new(SyncStatus::Offline),
                throttle,
                fetches: FetchTracker::default(),
                structural: tokio::sync::Mutex::new(()),
                tag_creation: tokio::sync::Mutex::new(()),
                settings,
            }),
        }
    }

    pub fn from_config(
        remote: Arc<dyn RemoteAuthority>,
        vault: StateVault,
        config: &Config,
    ) -> Self {
        Self::new(remote, vault, EngineSettings::from_config(config))
    }

    /// Run `intent` on its own task. Failures surface through
    /// [`take_errors`](Self::take_errors), never through the handle.
    pub fn dispatch(&self, intent: Intent) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.handle(intent).await })
    }

    /// Run `intent` to completion on the current task.
    ///
    /// Field edits return once the optimistic value is committed; the
    /// throttled send happens in the background.
    pub async fn handle(&self, intent: Intent) {
        self.inner.handle(intent).await
    }

    /// Send pending throttled edits immediately. Call before shutting down.
    pub async fn flush(&self) {
        self.inner.flush_pending().await
    }

    /// Start the background connectivity monitor.
    pub fn spawn_connectivity_monitor(&self) -> JoinHandle<()> {
        health::spawn_connectivity_monitor(self.inner.clone())
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Drain the error signals raised since the last call.
    pub fn take_errors(&self) -> Vec<ErrorSignal> {
        self.inner.state.take_signals()
    }

    /// Consume the one-shot "just created" note id.
    pub fn take_just_created(&self) -> Option<NoteId> {
        self.inner.state.commit(|tree| tree.take_just_created())
    }

    pub fn session(&self) -> SessionView {
        let session = self.inner.guard.session();
        SessionView {
            username: session.username,
            email: session.email,
            authenticated: session.authenticated,
            state: self.inner.guard.state(),
        }
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.inner.guard
    }

    /// Copy of the whole store tree.
    pub fn snapshot(&self) -> StoreTree {
        self.inner.state.read(|tree| tree.clone())
    }

    pub fn sections(&self) -> Vec<entity_store::Section> {
        self.inner
            .state
            .read(|tree| tree.sections.sorted().into_iter().cloned().collect())
    }

    pub fn section_view(&self, section: SectionId) -> Option<SectionView> {
        self.inner.state.read(|tree| {
            let found = tree.sections.get(section)?.clone();
            let owned = |tags: Vec<&Tag>| tags.into_iter().cloned().collect::<Vec<_>>();
            Some(SectionView {
                section: found,
                filter: FilterEngine::meta(tree, section),
                tags: owned(tree.tags.sorted_in(section)),
                notes: tree.notes.sorted_in(section).into_iter().cloned().collect(),
                visible_notes: FilterEngine::visible_notes(tree, section)
                    .into_iter()
                    .cloned()
                    .collect(),
                active_tags: owned(FilterEngine::active_tags(tree, section)),
                available_tags: owned(FilterEngine::available_tags(tree, section)),
            })
        })
    }

    /// Tags of the note's section, split into carried and not carried.
    pub fn note_tags(&self, note: NoteId) -> NoteTags {
        self.inner.state.read(|tree| {
            let Some(found) = tree.notes.get(note) else {
                return NoteTags::default();
            };
            let (owned, unowned): (Vec<&Tag>, Vec<&Tag>) = tree
                .tags
                .sorted_in(found.section)
                .into_iter()
                .partition(|tag| found.has_tag(tag.id));
            NoteTags {
                owned: owned.into_iter().cloned().collect(),
                unowned: unowned.into_iter().cloned().collect(),
            }
        })
    }

    /// Tags the note does not carry whose label contains `query`.
    pub fn tag_suggestions(&self, note: NoteId, query: &str) -> Vec<Tag> {
        let query = query.to_lowercase();
        self.note_tags(note)
            .unowned
            .into_iter()
            .filter(|tag| tag.label.contains(&query))
            .collect()
    }

    /// Every broken tag/note membership reference currently in the stores.
    pub fn audit(&self) -> Vec<Asymmetry> {
        self.inner.state.read(RelationMaintainer::audit)
    }
}

impl EngineInner {
    pub(crate) async fn handle(self: &Arc<Self>, intent: Intent) {
        let operation = intent.name();
        debug!(operation, "Handling intent");

        let result = match intent {
            Intent::FetchSections => self.fetch_sections().await,
            Intent::CreateSection { name } => self.create_section(name).await,
            Intent::RenameSection { id, name } => self.rename_section(id, name),
            Intent::DeleteSection { id } => self.delete_section(id).await,
            Intent::ActivateSection { id } => self.activate_section(id).await,

            Intent::FetchTags { section } => self.fetch_tags(section).await,
            Intent::CreateTag {
                section,
                label,
                notes,
            } => self.create_tag(section, &label, notes).await.map(|_| ()),
            Intent::RenameTag { id, label } => self.rename_tag(id, &label),
            Intent::DeleteTag { id } => self.delete_tag(id).await,

            Intent::ToggleTagFilter { section, tag } => self.toggle_tag_filter(section, tag),
            Intent::ToggleFilterMode { section } => self.toggle_filter_mode(section),
            Intent::ResetFilter { section } => self.reset_filter(section),

            Intent::FetchNotes { section } => self.fetch_notes(section).await,
            Intent::CreateNote { section } => self.create_note(section).await,
            Intent::UpdateNoteTitle { id, title } => self.update_note_title(id, title),
            Intent::UpdateNoteContent { id, content } => self.update_note_content(id, content),
            Intent::AddTagToNote { note, tag } => self.add_tag_to_note(note, tag).await,
            Intent::AddTagByLabel { note, label } => self.add_tag_by_label(note, &label).await,
            Intent::RemoveTagFromNote { note, tag } => self.remove_tag_from_note(note, tag).await,
            Intent::DeleteNote { id } => self.delete_note(id).await,

            Intent::SignIn { credentials } => self.sign_in(&credentials).await,
            Intent::SignUp { credentials } => self.sign_up(&credentials).await,
            Intent::SignOut => self.sign_out().await,
        };

        if let Err(e) = result {
            self.report(operation, e);
        }
    }

    /// Turn a failure into an error signal.
    pub(crate) fn report(&self, operation: &str, err: EngineError) {
        if err.is_network() {
            self.status.set(SyncStatus::Offline);
            warn!(
                operation,
                retryable = err.is_transient(),
                error = %err,
                "Remote call failed, going offline"
            );
        } else if let EngineError::RelationInconsistency(_) = err {
            error!(operation, error = %err, "Relation inconsistency");
        } else {
            info!(operation, error = %err, "Intent rejected");
        }
        self.state.push_signal(ErrorSignal::new(operation, &err));
    }
}
