//! WebSocket message protocol.
//!
//! Every message is a full snapshot; there are no patches:
//!
//! ```json
//! {"type":"document","revision":3,"document":{"docid":"demo","roots":[],"shell":{...}}}
//! ```

use serde::Serialize;

use crate::document::Document;

/// A published snapshot as sent to clients.
///
/// `revision` increases by one per push, so clients can drop stale frames.
#[derive(Debug, Serialize)]
pub struct DocumentMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    pub revision: u64,
    pub document: &'a Document,
}

impl<'a> DocumentMessage<'a> {
    pub fn new(revision: u64, document: &'a Document) -> Self {
        Self {
            kind: "document",
            revision,
            document,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
