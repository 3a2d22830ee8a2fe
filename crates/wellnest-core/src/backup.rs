//! JSON snapshots of the wellness state, stored in the backup bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::objectstore::ObjectStore;
use crate::tracker::WellnessState;

pub const BACKUP_FORMAT_VERSION: u32 = 1;
pub const BACKUP_CONTENT_TYPE: &str = "application/json";

/// Everything needed to restore the state on another machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub state: WellnessState,
}

impl BackupSnapshot {
    pub fn new(state: WellnessState, now: DateTime<Utc>) -> Self {
        Self {
            format_version: BACKUP_FORMAT_VERSION,
            exported_at: now,
            state,
        }
    }

    /// # Errors
    /// Serialization failure.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// # Errors
    /// Unparsable JSON, a newer format version, or a state that breaks
    /// [`WellnessState::validate`].
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: BackupSnapshot = serde_json::from_slice(bytes)?;
        if snapshot.format_version > BACKUP_FORMAT_VERSION {
            return Err(ValidationError::invalid(
                "format_version",
                format!(
                    "backup format {} is newer than supported format {BACKUP_FORMAT_VERSION}",
                    snapshot.format_version
                ),
            )
            .into());
        }
        snapshot.state.validate()?;
        Ok(snapshot)
    }
}

/// Object key for a backup taken at `now`.
pub fn backup_key(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}wellnest-{}.json", now.format("%Y%m%dT%H%M%SZ"))
}

fn is_backup_key(key: &str) -> bool {
    key.rsplit('/')
        .next()
        .is_some_and(|name| name.starts_with("wellnest-") && name.ends_with(".json"))
}

/// Upload `state` and return the key it was stored under.
///
/// # Errors
/// Serialization or transfer failure.
pub async fn push(store: &ObjectStore, state: &WellnessState, now: DateTime<Utc>) -> Result<String> {
    let key = backup_key(&store.settings().prefix, now);
    let body = BackupSnapshot::new(state.clone(), now).to_json_bytes()?;
    store.put_object(&key, BACKUP_CONTENT_TYPE, body, now).await?;
    Ok(key)
}

/// Download a snapshot; with no key, the newest backup under the prefix.
///
/// # Errors
/// No backups found, transfer failure, or an unreadable snapshot.
pub async fn pull(
    store: &ObjectStore,
    key: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(String, BackupSnapshot)> {
    let key = match key {
        Some(k) => k.to_string(),
        None => {
            let prefix = store.settings().prefix.clone();
            let objects = store.list(Some(prefix.as_str()), now).await?;
            objects
                .into_iter()
                .find(|o| is_backup_key(&o.key))
                .map(|o| o.key)
                .ok_or(CoreError::NotFound {
                    kind: "backup",
                    id: prefix,
                })?
        }
    };
    let bytes = store.get_object(&key, now).await?;
    let snapshot = BackupSnapshot::from_json_bytes(&bytes)?;
    tracing::info!(
        key = %key,
        exported_at = %snapshot.exported_at,
        items = snapshot.state.items.len(),
        "restored backup snapshot"
    );
    Ok((key, snapshot))
}
