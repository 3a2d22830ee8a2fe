//! Backup commands against the configured bucket.
//!
//! Every network call runs on a current-thread tokio runtime built for the
//! one command.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use wellnest_core::backup;
use wellnest_core::{Config, ObjectStore, ObjectStoreError, PresignOperation};

use super::{print_json, Session};

const LAST_BACKUP_KEY: &str = "last_backup";

#[derive(Subcommand)]
pub enum BackupAction {
    /// List objects in the bucket, newest first
    List {
        /// Key prefix (defaults to storage.prefix)
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Presign a single read or write of an object (valid 15 minutes)
    Presign {
        /// Object key
        key: String,
        /// read or write
        #[arg(long, default_value = "read")]
        operation: String,
        /// Content type for writes
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Upload the current state as a JSON snapshot
    Push,
    /// Replace the local state with a snapshot from the bucket
    Pull {
        /// Object key (defaults to the newest backup)
        key: Option<String>,
    },
    /// Key of the last backup pushed or pulled on this machine
    Last,
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub fn run(action: BackupAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BackupAction::List { prefix } => {
            let config = Config::load()?;
            let store = ObjectStore::from_config(&config.storage)?;
            let prefix = prefix.unwrap_or_else(|| store.settings().prefix.clone());
            let objects = runtime()?.block_on(store.list(Some(prefix.as_str()), Utc::now()))?;
            print_json(&objects)?;
        }
        BackupAction::Presign {
            key,
            operation,
            content_type,
        } => {
            let operation: PresignOperation = operation.parse()?;
            if key.trim().is_empty() {
                return Err(ObjectStoreError::Validation("object key is required".into()).into());
            }
            let config = Config::load()?;
            let store = ObjectStore::from_config(&config.storage)?;
            let signed = store.presign(&key, operation, content_type.as_deref(), Utc::now())?;
            print_json(&signed)?;
        }
        BackupAction::Push => {
            let session = Session::open()?;
            let store = ObjectStore::from_config(&session.config.storage)?;
            let key = runtime()?.block_on(backup::push(&store, &session.state, Utc::now()))?;
            session.db.kv_set(LAST_BACKUP_KEY, &key)?;
            print_json(&json!({
                "key": key,
                "items": session.state.items.len(),
                "journal_entries": session.state.journal.len(),
            }))?;
        }
        BackupAction::Pull { key } => {
            let mut session = Session::open()?;
            let store = ObjectStore::from_config(&session.config.storage)?;
            let (key, snapshot) =
                runtime()?.block_on(backup::pull(&store, key.as_deref(), Utc::now()))?;

            session.state = snapshot.state;
            session.state.refresh(session.today, &session.engine);
            session.save()?;
            session.db.kv_set(LAST_BACKUP_KEY, &key)?;
            print_json(&json!({
                "key": key,
                "exported_at": snapshot.exported_at,
                "items": session.state.items.len(),
                "journal_entries": session.state.journal.len(),
            }))?;
        }
        BackupAction::Last => {
            let session = Session::open()?;
            let key = session.db.kv_get(LAST_BACKUP_KEY)?;
            print_json(&json!({ "last_backup": key }))?;
        }
    }
    Ok(())
}
