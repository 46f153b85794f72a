//! Subcommand handling.

use crate::{Cli, Commands};
use clap::Subcommand;
use entity_store::{NoteId, SectionId, TagId};
use notebook_config_and_utils::{init_logging_at, Config, Paths};
use notebook_storage::{FileStorage, StateVault};
use remote_authority::{Credentials, HttpRemoteAuthority, RemoteAuthority};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use sync_engine::{Engine, Intent};
use tracing::{debug, info};

#[derive(Subcommand)]
pub enum SectionCommand {
    /// Create a section
    Create { name: String },
    /// Rename a section
    Rename { id: u64, name: String },
    /// Delete a section with its tags and notes
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum TagCommand {
    /// Create a tag, optionally attached to notes
    Create {
        #[arg(long)]
        section: u64,
        label: String,
        /// Note to attach the tag to (repeatable)
        #[arg(long = "note")]
        notes: Vec<u64>,
    },
    /// Rename a tag
    Rename { id: u64, label: String },
    /// Delete a tag
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum FilterCommand {
    /// Activate or deactivate a tag filter
    Toggle {
        #[arg(long)]
        section: u64,
        tag: u64,
    },
    /// Switch between AND and OR filtering
    Mode {
        #[arg(long)]
        section: u64,
    },
    /// Clear every active tag
    Reset {
        #[arg(long)]
        section: u64,
    },
}

#[derive(Subcommand)]
pub enum NoteCommand {
    /// Create an empty note and print its id
    Create {
        #[arg(long)]
        section: u64,
    },
    /// Set a note's title
    Title { id: u64, title: String },
    /// Set a note's content
    Content { id: u64, content: String },
    /// Attach an existing tag
    AddTag { id: u64, tag: u64 },
    /// Attach a tag by label, creating it if needed
    Label { id: u64, label: String },
    /// Detach a tag
    RemoveTag { id: u64, tag: u64 },
    /// Delete a note
    Delete { id: u64 },
    /// Print the tags a note carries and the ones it could carry
    Tags { id: u64 },
    /// Suggest tags whose label contains QUERY
    Suggest { id: u64, query: String },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging_at(&level, &paths.log_file(), false);
    debug!(base_dir = %paths.base_dir().display(), "Loaded configuration");

    let vault = StateVault::new(Arc::new(FileStorage::open(paths.state_file())?));
    let remote = Arc::new(HttpRemoteAuthority::new(
        config.server_url()?,
        config.request_timeout(),
    )?);
    let engine = Engine::from_config(remote.clone(), vault, &config);

    match cli.command {
        Commands::Show { section } => show(&engine, section.map(SectionId))?,
        Commands::Status => {
            let reachable = remote.health().await.is_ok();
            print_json(&json!({
                "session": engine.session(),
                "server_url": config.server_url,
                "reachable": reachable,
            }))?;
        }
        Commands::Sync => {
            engine.handle(Intent::FetchSections).await;
            for section in engine.sections() {
                engine
                    .handle(Intent::ActivateSection { id: section.id })
                    .await;
            }
            show(&engine, None)?;
        }
        Commands::SignIn { username, password } => {
            engine
                .handle(Intent::SignIn {
                    credentials: Credentials::sign_in(username, password),
                })
                .await;
            print_json(&engine.session())?;
        }
        Commands::SignUp {
            username,
            email,
            password,
        } => {
            engine
                .handle(Intent::SignUp {
                    credentials: Credentials::sign_up(username, email, password),
                })
                .await;
            print_json(&engine.session())?;
        }
        Commands::SignOut => {
            engine.handle(Intent::SignOut).await;
            print_json(&engine.session())?;
        }
        Commands::Section(command) => engine.handle(section_intent(command)).await,
        Commands::Tag(command) => engine.handle(tag_intent(command)).await,
        Commands::Filter(command) => {
            let (intent, section) = filter_intent(command);
            engine.handle(intent).await;
            show(&engine, Some(section))?;
        }
        Commands::Note(command) => note(&engine, command).await?,
    }

    engine.flush().await;

    let errors = engine.take_errors();
    if !errors.is_empty() {
        eprintln!("{}", serde_json::to_string_pretty(&errors)?);
        anyhow::bail!("{} operation(s) failed", errors.len());
    }
    info!("Done");
    Ok(())
}

fn section_intent(command: SectionCommand) -> Intent {
    match command {
        SectionCommand::Create { name } => Intent::CreateSection { name },
        SectionCommand::Rename { id, name } => Intent::RenameSection {
            id: SectionId(id),
            name,
        },
        SectionCommand::Delete { id } => Intent::DeleteSection { id: SectionId(id) },
    }
}

fn tag_intent(command: TagCommand) -> Intent {
    match command {
        TagCommand::Create {
            section,
            label,
            notes,
        } => Intent::CreateTag {
            section: SectionId(section),
            label,
            notes: notes.into_iter().map(NoteId).collect(),
        },
        TagCommand::Rename { id, label } => Intent::RenameTag {
            id: TagId(id),
            label,
        },
        TagCommand::Delete { id } => Intent::DeleteTag { id: TagId(id) },
    }
}

fn filter_intent(command: FilterCommand) -> (Intent, SectionId) {
    match command {
        FilterCommand::Toggle { section, tag } => (
            Intent::ToggleTagFilter {
                section: SectionId(section),
                tag: TagId(tag),
            },
            SectionId(section),
        ),
        FilterCommand::Mode { section } => (
            Intent::ToggleFilterMode {
                section: SectionId(section),
            },
            SectionId(section),
        ),
        FilterCommand::Reset { section } => (
            Intent::ResetFilter {
                section: SectionId(section),
            },
            SectionId(section),
        ),
    }
}

async fn note(engine: &Engine, command: NoteCommand) -> anyhow::Result<()> {
    let intent = match command {
        NoteCommand::Create { section } => {
            engine
                .handle(Intent::CreateNote {
                    section: SectionId(section),
                })
                .await;
            if let Some(id) = engine.take_just_created() {
                print_json(&json!({ "id": id }))?;
            }
            return Ok(());
        }
        NoteCommand::Tags { id } => return print_json(&engine.note_tags(NoteId(id))),
        NoteCommand::Suggest { id, query } => {
            return print_json(&engine.tag_suggestions(NoteId(id), &query));
        }
        NoteCommand::Title { id, title } => Intent::UpdateNoteTitle {
            id: NoteId(id),
            title,
        },
        NoteCommand::Content { id, content } => Intent::UpdateNoteContent {
            id: NoteId(id),
            content,
        },
        NoteCommand::AddTag { id, tag } => Intent::AddTagToNote {
            note: NoteId(id),
            tag: TagId(tag),
        },
        NoteCommand::Label { id, label } => Intent::AddTagByLabel {
            note: NoteId(id),
            label,
        },
        NoteCommand::RemoveTag { id, tag } => Intent::RemoveTagFromNote {
            note: NoteId(id),
            tag: TagId(tag),
        },
        NoteCommand::Delete { id } => Intent::DeleteNote { id: NoteId(id) },
    };
    engine.handle(intent).await;
    Ok(())
}

fn show(engine: &Engine, section: Option<SectionId>) -> anyhow::Result<()> {
    let sections: Vec<_> = match section {
        Some(id) => engine.section_view(id).into_iter().collect(),
        None => engine
            .sections()
            .into_iter()
            .filter_map(|s| engine.section_view(s.id))
            .collect(),
    };
    print_json(&json!({
        "session": engine.session(),
        "status": engine.status(),
        "sections": sections,
    }))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
