//! Opening the stable link in the user's browser.

use std::io;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

/// Side-effect seam for launching a browser.
pub trait BrowserOpener {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

/// Opener program plus the arguments placed before the URL.
fn opener_command() -> (&'static str, &'static [&'static str]) {
    #[cfg(target_os = "windows")]
    return ("cmd", &["/C", "start", ""]);

    #[cfg(target_os = "macos")]
    return ("open", &[]);

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    return ("xdg-open", &[]);
}

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let (program, args) = opener_command();
        let program = which::which(program)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{program}: {e}")))?;

        let mut command = Command::new(program);
        command.args(args).arg(url);
        spawn_reaped(command).map(drop)
    }
}

/// Spawn `command` with null stdio and reap it from a background thread.
fn spawn_reaped(mut command: Command) -> io::Result<JoinHandle<()>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    thread::Builder::new()
        .name("livedoc-opener".into())
        .spawn(move || {
            if let Err(e) = child.wait() {
                crate::debug!("browser"; "failed to reap opener: {}", e);
            }
        })
}
