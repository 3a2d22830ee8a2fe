//! ListObjectsV2 response parsing.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::error::ObjectStoreError;

/// One object in a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ListPage {
    pub objects: Vec<ObjectSummary>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

#[derive(Default)]
struct PartialObject {
    key: Option<String>,
    size: Option<u64>,
    last_modified: Option<DateTime<Utc>>,
}

impl PartialObject {
    fn finish(self) -> Result<ObjectSummary, ObjectStoreError> {
        match (self.key, self.size, self.last_modified) {
            (Some(key), Some(size), Some(last_modified)) => Ok(ObjectSummary {
                key,
                size,
                last_modified,
            }),
            (key, _, _) => Err(ObjectStoreError::Retrieval(format!(
                "incomplete <Contents> entry{}",
                key.map(|k| format!(" for '{k}'")).unwrap_or_default()
            ))),
        }
    }
}

fn bad_body(message: impl std::fmt::Display) -> ObjectStoreError {
    ObjectStoreError::Retrieval(format!("unparsable listing response: {message}"))
}

/// Parse a `ListBucketResult` document.
pub(crate) fn parse_list_page(body: &str) -> Result<ListPage, ObjectStoreError> {
    let mut reader = Reader::from_str(body);
    let mut page = ListPage::default();
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<PartialObject> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if path.is_empty() {
                    if name != "ListBucketResult" {
                        return Err(bad_body(format!("unexpected root element <{name}>")));
                    }
                    saw_root = true;
                }
                if name == "Contents" && path.len() == 1 {
                    current = Some(PartialObject::default());
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if name == "Contents" && path.len() == 1 {
                        if let Some(obj) = current.take() {
                            page.objects.push(obj.finish()?);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(bad_body)?;
                let text = text.trim();
                let depth = path.len();
                let leaf = path.last().map(String::as_str);
                match (depth, leaf) {
                    (2, Some("IsTruncated")) => page.is_truncated = text == "true",
                    (2, Some("NextContinuationToken")) => {
                        page.next_continuation_token = Some(text.to_string())
                    }
                    (3, Some(field)) => {
                        if let Some(obj) = current.as_mut() {
                            match field {
                                "Key" => obj.key = Some(text.to_string()),
                                "Size" => {
                                    obj.size = Some(text.parse().map_err(|e| {
                                        bad_body(format!("bad size '{text}': {e}"))
                                    })?)
                                }
                                "LastModified" => {
                                    obj.last_modified = Some(
                                        DateTime::parse_from_rfc3339(text)
                                            .map_err(|e| {
                                                bad_body(format!("bad timestamp '{text}': {e}"))
                                            })?
                                            .with_timezone(&Utc),
                                    )
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(bad_body(e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err(bad_body("missing <ListBucketResult>"));
    }
    Ok(page)
}
