//! Source Loader - executes the application source into a fresh Document.
//!
//! Every call builds a brand-new Lua state, so nothing defined by a previous
//! load is reachable. The state is dropped when the call returns.
//!
//! ```text
//! read file → new Lua state → install doc/app API → exec chunk → Document
//!                                                        ↓
//!                                                    LoadError
//! ```

mod api;
mod error;

pub use error::{LoadError, SourceLocation};

use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mlua::{HookTriggers, Lua, VmState};

use crate::core::{AppContext, shutdown_flag};
use crate::document::Document;

/// Executes application source into a Document.
///
/// Implementations must not panic or leak state between calls.
pub trait SourceLoader {
    /// Populate `into` (a brand-new empty Document) from the file at `path`.
    fn load(&self, path: &Path, into: Document) -> Result<Document, LoadError>;
}

/// Instructions between two checks of the interrupt flag.
const INTERRUPT_CHECK_EVERY: u32 = 10_000;

/// Runs the source file as a Lua 5.4 chunk.
pub struct LuaLoader {
    ctx: Arc<AppContext>,
    interrupt: Arc<AtomicBool>,
}

impl LuaLoader {
    /// Loader that aborts a running chunk once shutdown is requested.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            interrupt: shutdown_flag(),
        }
    }

    /// Abort running chunks when `flag` is set instead of on shutdown.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    fn execute(&self, source: &[u8], chunk: &str, into: Document) -> Result<Document, LoadError> {
        let lua = Lua::new();
        lua.set_app_data(into);

        let interrupt = Arc::clone(&self.interrupt);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(INTERRUPT_CHECK_EVERY),
            move |_, _| {
                if interrupt.load(Ordering::Relaxed) {
                    Err(mlua::Error::runtime("load interrupted by shutdown"))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );

        api::install(&lua, &self.ctx)
            .and_then(|()| lua.load(source).set_name(format!("@{chunk}")).exec())
            .map_err(|e| LoadError::from_lua(&e, chunk))?;

        lua.remove_app_data::<Document>()
            .ok_or_else(|| LoadError::new("document was lost during execution"))
    }
}

impl SourceLoader for LuaLoader {
    fn load(&self, path: &Path, into: Document) -> Result<Document, LoadError> {
        let source = fs::read(path).map_err(|e| LoadError::io(path, &e))?;
        let chunk = chunk_name(path);

        crate::debug!("load"; "executing {} ({} bytes)", chunk, source.len());

        catch_unwind(AssertUnwindSafe(|| self.execute(&source, &chunk, into)))
            .unwrap_or_else(|payload| Err(LoadError::panic(payload.as_ref())))
    }
}

/// Lua chunk name: the bare file name, so positions read `doc.lua:3:`.
fn chunk_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
