//! Server-owned overlay state carried on every Document.

use serde::Serialize;

/// Surface for the last reload failure.
///
/// `visible` is true exactly when `message` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorPanel {
    pub message: String,
    pub visible: bool,
}

impl ErrorPanel {
    /// Show a failure trace. An empty trace hides the panel.
    pub fn show(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.visible = !self.message.is_empty();
    }

    pub fn hide(&mut self) {
        self.message.clear();
        self.visible = false;
    }

    /// `visible` and `message` agree.
    pub fn is_consistent(&self) -> bool {
        self.visible == !self.message.is_empty()
    }
}

/// Transient "reloading" affordance for connected clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReloadingIndicator {
    pub visible: bool,
}

/// Error panel plus reloading indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DevelopShell {
    pub error_panel: ErrorPanel,
    pub reloading: ReloadingIndicator,
}

impl DevelopShell {
    /// Enter a reload: indicator on, previous error cleared.
    pub fn begin_reload(&mut self) {
        self.reloading.visible = true;
        self.error_panel.hide();
    }

    /// Leave a reload on either path.
    pub fn end_reload(&mut self) {
        self.reloading.visible = false;
    }
}
