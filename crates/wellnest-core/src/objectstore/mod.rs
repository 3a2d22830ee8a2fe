//! S3-compatible bucket client used for backups.
//!
//! Two operations are exposed to callers: listing objects under a prefix and
//! presigning a single read or write. Uploads and downloads go through the
//! same presigned URLs, so object bytes never need a signed header set.

mod listing;
pub mod sigv4;

pub use listing::ObjectSummary;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::ObjectStoreError;
use crate::storage::StorageConfig;
use sigv4::SignableRequest;

/// Lifetime of every presigned URL handed out.
pub const PRESIGN_EXPIRY_SECS: u64 = 15 * 60;

/// Content type used for writes when the caller gives none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const MAX_LIST_PAGES: usize = 1000;

/// Access credentials, read from the environment only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully resolved connection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub region: String,
    pub bucket: String,
    /// Custom endpoint; `None` means AWS virtual-hosted addressing
    pub endpoint: Option<Url>,
    pub prefix: String,
    pub credentials: Credentials,
}

impl StorageSettings {
    /// Resolve from config plus the process environment.
    ///
    /// # Errors
    /// [`ObjectStoreError::Configuration`] naming every missing parameter.
    pub fn resolve(config: &StorageConfig) -> Result<Self, ObjectStoreError> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve using `env` as the variable lookup.
    ///
    /// # Errors
    /// [`ObjectStoreError::Configuration`] naming every missing parameter.
    pub fn resolve_with<F>(config: &StorageConfig, env: F) -> Result<Self, ObjectStoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |names: &[&str], fallback: &str| -> Option<String> {
            names
                .iter()
                .filter_map(|n| env(n))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
                .or_else(|| Some(fallback.trim().to_string()).filter(|v| !v.is_empty()))
        };

        let region = lookup(&["WELLNEST_S3_REGION", "AWS_REGION"], &config.region);
        let bucket = lookup(&["WELLNEST_S3_BUCKET"], &config.bucket);
        let endpoint = lookup(&["WELLNEST_S3_ENDPOINT"], &config.endpoint);
        let access_key_id = lookup(&["WELLNEST_S3_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"], "");
        let secret_access_key =
            lookup(&["WELLNEST_S3_SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY"], "");
        let session_token = lookup(&["AWS_SESSION_TOKEN"], "");

        let mut missing = Vec::new();
        if region.is_none() {
            missing.push("region".to_string());
        }
        if bucket.is_none() {
            missing.push("bucket".to_string());
        }
        if access_key_id.is_none() {
            missing.push("access key id".to_string());
        }
        if secret_access_key.is_none() {
            missing.push("secret access key".to_string());
        }

        let endpoint = match endpoint {
            Some(raw) => match Url::parse(&raw) {
                Ok(url) if url.host_str().is_some() => Some(url),
                _ => {
                    missing.push(format!("valid endpoint URL (got '{raw}')"));
                    None
                }
            },
            None => None,
        };

        match (region, bucket, access_key_id, secret_access_key) {
            (Some(region), Some(bucket), Some(access_key_id), Some(secret_access_key))
                if missing.is_empty() =>
            {
                Ok(Self {
                    region,
                    bucket,
                    endpoint,
                    prefix: config.prefix.clone(),
                    credentials: Credentials {
                        access_key_id,
                        secret_access_key,
                        session_token,
                    },
                })
            }
            _ => Err(ObjectStoreError::Configuration { missing }),
        }
    }
}

/// What a presigned URL may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresignOperation {
    Read,
    Write,
}

impl PresignOperation {
    pub fn method(&self) -> &'static str {
        match self {
            PresignOperation::Read => "GET",
            PresignOperation::Write => "PUT",
        }
    }
}

impl FromStr for PresignOperation {
    type Err = ObjectStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(PresignOperation::Read),
            "write" => Ok(PresignOperation::Write),
            other => Err(ObjectStoreError::Validation(format!(
                "operation must be 'read' or 'write', got '{other}'"
            ))),
        }
    }
}

/// A presigned URL and how to use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
    /// Headers the client must send unchanged
    pub headers: BTreeMap<String, String>,
}

/// Bucket client.
pub struct ObjectStore {
    settings: StorageSettings,
    http: Client,
}

impl ObjectStore {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            settings,
            http: Client::new(),
        }
    }

    /// # Errors
    /// Missing connection parameters.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ObjectStoreError> {
        Ok(Self::new(StorageSettings::resolve(config)?))
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Presign one read or write of `key`, valid for 15 minutes from `now`.
    ///
    /// # Errors
    /// [`ObjectStoreError::Validation`] for a blank key.
    pub fn presign(
        &self,
        key: &str,
        operation: PresignOperation,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PresignedUrl, ObjectStoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ObjectStoreError::Validation("object key is required".into()));
        }

        let content_type = match operation {
            PresignOperation::Read => None,
            PresignOperation::Write => Some(
                content_type
                    .map(str::trim)
                    .filter(|ct| !ct.is_empty())
                    .unwrap_or(DEFAULT_CONTENT_TYPE),
            ),
        };

        let request = SignableRequest {
            method: operation.method(),
            key: Some(key),
            query: Vec::new(),
            content_type,
            expires_secs: PRESIGN_EXPIRY_SECS,
        };
        let url = sigv4::presign(&self.settings, &request, now)?;

        let mut headers = BTreeMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), ct.to_string());
        }
        tracing::debug!(key, method = operation.method(), "presigned object URL");

        Ok(PresignedUrl {
            url: url.to_string(),
            method: operation.method().to_string(),
            expires_at: now + Duration::seconds(PRESIGN_EXPIRY_SECS as i64),
            headers,
        })
    }

    /// List objects under `prefix`, newest first, following continuation
    /// tokens until the listing is complete.
    ///
    /// # Errors
    /// [`ObjectStoreError::Retrieval`] when a request fails, returns a
    /// non-success status, or the body does not parse.
    pub async fn list(
        &self,
        prefix: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ObjectSummary>, ObjectStoreError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("list-type".to_string(), "2".to_string())];
            if let Some(p) = prefix.filter(|p| !p.is_empty()) {
                query.push(("prefix".to_string(), p.to_string()));
            }
            if let Some(t) = &token {
                query.push(("continuation-token".to_string(), t.clone()));
            }
            let request = SignableRequest {
                method: "GET",
                key: None,
                query,
                content_type: None,
                expires_secs: PRESIGN_EXPIRY_SECS,
            };
            let url = sigv4::presign(&self.settings, &request, now)?;

            let resp = self.http.get(url).send().await.map_err(|e| {
                tracing::warn!(error = %e, "listing request failed");
                ObjectStoreError::Retrieval(e.to_string())
            })?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| ObjectStoreError::Retrieval(e.to_string()))?;
            if !status.is_success() {
                tracing::warn!(%status, "listing rejected by storage");
                return Err(ObjectStoreError::Retrieval(format!(
                    "HTTP {status}: {}",
                    body.chars().take(300).collect::<String>()
                )));
            }

            let page = listing::parse_list_page(&body)?;
            objects.extend(page.objects);
            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => {
                    objects.sort_by(|a, b| {
                        b.last_modified
                            .cmp(&a.last_modified)
                            .then_with(|| a.key.cmp(&b.key))
                    });
                    tracing::info!(count = objects.len(), prefix = prefix.unwrap_or(""), "listed objects");
                    return Ok(objects);
                }
            }
        }

        Err(ObjectStoreError::Retrieval(format!(
            "listing did not finish within {MAX_LIST_PAGES} pages"
        )))
    }

    /// Upload `body` to `key` through a presigned write.
    ///
    /// # Errors
    /// [`ObjectStoreError::Transfer`] on request failure or non-success status.
    pub async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        let signed = self.presign(key, PresignOperation::Write, Some(content_type), now)?;
        let mut req = self.http.put(&signed.url).body(body);
        for (name, value) in &signed.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transfer(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ObjectStoreError::Transfer(format!("upload of '{key}' returned HTTP {status}")));
        }
        tracing::info!(key, "uploaded object");
        Ok(())
    }

    /// Download `key` through a presigned read.
    ///
    /// # Errors
    /// [`ObjectStoreError::Transfer`] on request failure or non-success status.
    pub async fn get_object(&self, key: &str, now: DateTime<Utc>) -> Result<Vec<u8>, ObjectStoreError> {
        let signed = self.presign(key, PresignOperation::Read, None, now)?;
        let resp = self
            .http
            .get(&signed.url)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transfer(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ObjectStoreError::Transfer(format!("download of '{key}' returned HTTP {status}")));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ObjectStoreError::Transfer(e.to_string()))?;
        tracing::info!(key, size = bytes.len(), "downloaded object");
        Ok(bytes.to_vec())
    }
}
