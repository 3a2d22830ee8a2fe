//! AWS Signature Version 4 query-string presigning.
//!
//! Only what the bucket client needs: presigned GET/PUT URLs with an
//! unsigned payload, optionally binding the `content-type` header.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use super::StorageSettings;
use crate::error::ObjectStoreError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// One request to presign.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Object key; `None` addresses the bucket itself (listing)
    pub key: Option<&'a str>,
    pub query: Vec<(String, String)>,
    /// Bound into the signature so the client must send the same header
    pub content_type: Option<&'a str>,
    pub expires_secs: u64,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn encode_key(key: &str) -> String {
    key.split('/').map(encode).collect::<Vec<_>>().join("/")
}

/// Derive the per-day signing key.
pub fn signing_key(secret: &str, date: &str, region: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Scheme, host header value and canonical path for a request.
fn locate(settings: &StorageSettings, key: Option<&str>) -> Result<(String, String, String), ObjectStoreError> {
    let key_path = key.map(encode_key);
    match &settings.endpoint {
        Some(endpoint) => {
            let host = endpoint.host_str().ok_or_else(|| ObjectStoreError::Configuration {
                missing: vec!["endpoint host".into()],
            })?;
            let host = match endpoint.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let base = endpoint.path().trim_end_matches('/');
            let mut path = format!("{base}/{}", encode(&settings.bucket));
            if let Some(k) = key_path {
                path.push('/');
                path.push_str(&k);
            }
            Ok((endpoint.scheme().to_string(), host, path))
        }
        None => {
            let host = if settings.region == "us-east-1" {
                format!("{}.s3.amazonaws.com", settings.bucket)
            } else {
                format!("{}.s3.{}.amazonaws.com", settings.bucket, settings.region)
            };
            let path = format!("/{}", key_path.unwrap_or_default());
            Ok(("https".to_string(), host, path))
        }
    }
}

/// Build a presigned URL for `request`, valid from `now` for `expires_secs`.
///
/// # Errors
/// Fails only when the configured endpoint has no host or the result does
/// not parse as a URL.
pub fn presign(
    settings: &StorageSettings,
    request: &SignableRequest<'_>,
    now: DateTime<Utc>,
) -> Result<Url, ObjectStoreError> {
    let (scheme, host, path) = locate(settings, request.key)?;
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{}/{SERVICE}/aws4_request", settings.region);
    let creds = &settings.credentials;

    let (canonical_headers, signed_headers) = match request.content_type {
        Some(ct) => (
            format!("content-type:{}\nhost:{host}\n", ct.trim()),
            "content-type;host",
        ),
        None => (format!("host:{host}\n"), "host"),
    };

    let mut params: Vec<(String, String)> = request.query.clone();
    params.push(("X-Amz-Algorithm".into(), ALGORITHM.into()));
    params.push((
        "X-Amz-Credential".into(),
        format!("{}/{scope}", creds.access_key_id),
    ));
    params.push(("X-Amz-Date".into(), amz_date.clone()));
    params.push(("X-Amz-Expires".into(), request.expires_secs.to_string()));
    if let Some(token) = &creds.session_token {
        params.push(("X-Amz-Security-Token".into(), token.clone()));
    }
    params.push(("X-Amz-SignedHeaders".into(), signed_headers.into()));

    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();
    let canonical_query = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD",
        request.method
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );
    let key = signing_key(&creds.secret_access_key, &date, &settings.region);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let raw = format!("{scheme}://{host}{path}?{canonical_query}&X-Amz-Signature={signature}");
    Url::parse(&raw).map_err(|e| ObjectStoreError::Validation(format!("bad presigned URL: {e}")))
}
