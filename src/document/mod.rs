//! In-memory document state.
//!
//! A [`Document`] is what the application script produces: a title and a
//! list of root models, plus the [`DevelopShell`] the server overlays on top
//! of it (error panel and reloading indicator).
//!
//! The controller owns the current Document. Publishers only ever see
//! `Arc<Document>` snapshots.

mod shell;

pub use shell::{DevelopShell, ErrorPanel, ReloadingIndicator};

use serde::Serialize;
use serde_json::{Map, Value};

/// One root object added by the application script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub props: Map<String, Value>,
}

/// The live state graph of the running application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Stable identifier, shared by every reload of the same application.
    pub docid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub roots: Vec<Model>,
    pub shell: DevelopShell,
    #[serde(skip)]
    next_id: u64,
}

impl Document {
    /// Create an empty Document.
    pub fn new(docid: impl Into<String>) -> Self {
        Self {
            docid: docid.into(),
            title: None,
            roots: Vec::new(),
            shell: DevelopShell::default(),
            next_id: 1,
        }
    }

    /// Append a root model and return its id.
    pub fn add_root(&mut self, kind: impl Into<String>, props: Map<String, Value>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.roots.push(Model {
            id,
            kind: kind.into(),
            props,
        });
        id
    }

    /// Remove every root and the title. Ids keep increasing.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.title = None;
    }

    /// Compare everything the application produced, ignoring the shell.
    pub fn same_content(&self, other: &Self) -> bool {
        self.docid == other.docid && self.title == other.title && self.roots == other.roots
    }
}
