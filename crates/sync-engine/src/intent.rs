//! Intents dispatched by the UI collaborator.

use entity_store::{NoteId, SectionId, TagId};
use remote_authority::Credentials;

/// Every operation the engine accepts.
#[derive(Debug, Clone)]
pub enum Intent {
    // Sections
    FetchSections,
    CreateSection { name: String },
    RenameSection { id: SectionId, name: String },
    DeleteSection { id: SectionId },
    /// Section became visible: create its filter state and pull its content.
    ActivateSection { id: SectionId },

    // Tags
    FetchTags { section: SectionId },
    CreateTag {
        section: SectionId,
        label: String,
        notes: Vec<NoteId>,
    },
    RenameTag { id: TagId, label: String },
    DeleteTag { id: TagId },

    // Filter
    ToggleTagFilter { section: SectionId, tag: TagId },
    ToggleFilterMode { section: SectionId },
    ResetFilter { section: SectionId },

    // Notes
    FetchNotes { section: SectionId },
    CreateNote { section: SectionId },
    UpdateNoteTitle { id: NoteId, title: String },
    UpdateNoteContent { id: NoteId, content: String },
    AddTagToNote { note: NoteId, tag: TagId },
    /// Attach a tag by label, creating the tag when the section has none.
    AddTagByLabel { note: NoteId, label: String },
    RemoveTagFromNote { note: NoteId, tag: TagId },
    DeleteNote { id: NoteId },

    // Session
    SignIn { credentials: Credentials },
    SignUp { credentials: Credentials },
    SignOut,
}

impl Intent {
    /// Stable operation name used in logs and error signals.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::FetchSections => "fetch_sections",
            Intent::CreateSection { .. } => "create_section",
            Intent::RenameSection { .. } => "rename_section",
            Intent::DeleteSection { .. } => "delete_section",
            Intent::ActivateSection { .. } => "activate_section",
            Intent::FetchTags { .. } => "fetch_tags",
            Intent::CreateTag { .. } => "create_tag",
            Intent::RenameTag { .. } => "rename_tag",
            Intent::DeleteTag { .. } => "delete_tag",
            Intent::ToggleTagFilter { .. } => "toggle_tag_filter",
            Intent::ToggleFilterMode { .. } => "toggle_filter_mode",
            Intent::ResetFilter { .. } => "reset_filter",
            Intent::FetchNotes { .. } => "fetch_notes",
            Intent::CreateNote { .. } => "create_note",
            Intent::UpdateNoteTitle { .. } => "update_note_title",
            Intent::UpdateNoteContent { .. } => "update_note_content",
            Intent::AddTagToNote { .. } => "add_tag_to_note",
            Intent::AddTagByLabel { .. } => "add_tag_by_label",
            Intent::RemoveTagFromNote { .. } => "remove_tag_from_note",
            Intent::DeleteNote { .. } => "delete_note",
            Intent::SignIn { .. } => "sign_in",
            Intent::SignUp { .. } => "sign_up",
            Intent::SignOut => "sign_out",
        }
    }
}
