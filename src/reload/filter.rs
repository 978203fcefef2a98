//! Relevance filter for watch events.

use crate::core::AppContext;
use crate::watch::{WatchEvent, WatchKind};

/// Should this event trigger a reload?
///
/// Only an in-place modification of the exact source file counts, and only
/// in develop mode. Creates, deletes, moves and sibling files are ignored.
pub fn is_relevant(event: &WatchEvent, ctx: &AppContext) -> bool {
    ctx.mode.is_develop() && event.kind == WatchKind::Modified && event.path == ctx.source_path
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::{Mode, test_context};

    fn ctx(mode: Mode) -> AppContext {
        test_context(Path::new("/work/app"), mode)
    }

    #[test]
    fn test_source_modified_is_relevant() {
        let event = WatchEvent::new("/work/app/doc.lua", WatchKind::Modified);
        assert!(is_relevant(&event, &ctx(Mode::Develop)));
    }

    #[test]
    fn test_run_mode_ignores_everything() {
        let event = WatchEvent::new("/work/app/doc.lua", WatchKind::Modified);
        assert!(!is_relevant(&event, &ctx(Mode::Run)));
    }

    #[test]
    fn test_other_kinds_ignored() {
        let ctx = ctx(Mode::Develop);
        for kind in [WatchKind::Created, WatchKind::Deleted, WatchKind::Moved] {
            let event = WatchEvent::new("/work/app/doc.lua", kind);
            assert!(!is_relevant(&event, &ctx), "{kind:?}");
        }
    }

    #[test]
    fn test_requires_exact_path() {
        let ctx = ctx(Mode::Develop);
        for path in [
            "/work/app/other.lua",
            "/work/app/doc.lua.swp",
            "/work/doc.lua",
            "/work/app/sub/doc.lua",
        ] {
            let event = WatchEvent::new(path, WatchKind::Modified);
            assert!(!is_relevant(&event, &ctx), "{path}");
        }
    }

    #[test]
    fn test_pure() {
        let ctx = ctx(Mode::Develop);
        let event = WatchEvent::new("/work/app/doc.lua", WatchKind::Modified);
        let first = is_relevant(&event, &ctx);
        assert_eq!(first, is_relevant(&event, &ctx));
        assert_eq!(first, is_relevant(&event.clone(), &ctx.clone()));
    }
}
