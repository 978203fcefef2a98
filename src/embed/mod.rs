//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `client` - The browser page that renders published Documents
//!
//! # Usage
//!
//! ```ignore
//! use embed::client::{CLIENT_HTML, ClientVars};
//!
//! let html = CLIENT_HTML.render(&ClientVars {
//!     ws_port: 5007,
//!     title: "demo",
//!     document_json: "{}",
//! });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod client {
    use std::sync::LazyLock;

    use regex::{Captures, Regex};

    use super::{Template, TemplateVars};
    use crate::utils::html::{escape, script_json};

    /// Variables for client.html.
    pub struct ClientVars<'a> {
        pub ws_port: u16,
        pub title: &'a str,
        /// Serialized Document, inlined as the first render.
        pub document_json: &'a str,
    }

    static PLACEHOLDER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"__LIVEDOC_[A-Z_]+__").expect("valid placeholder regex"));

    impl TemplateVars for ClientVars<'_> {
        // Single pass, so user text that looks like a placeholder is left alone.
        fn apply(&self, content: &str) -> String {
            PLACEHOLDER
                .replace_all(content, |caps: &Captures| match &caps[0] {
                    "__LIVEDOC_WS_PORT__" => self.ws_port.to_string(),
                    "__LIVEDOC_TITLE__" => escape(self.title).into_owned(),
                    "__LIVEDOC_DOCUMENT__" => script_json(self.document_json).into_owned(),
                    other => other.to_string(),
                })
                .into_owned()
        }
    }

    /// Client page with WebSocket port and initial snapshot injection.
    pub const CLIENT_HTML: Template<ClientVars<'static>> = Template::new(include_str!("client.html"));

}
