//! Server lifecycle management.

use crate::publish::Publisher;
use crate::watch::ChangeDetector;

/// Print a fatal message to stderr and exit with status 1.
pub fn die(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1)
}

/// Tear down after the run loop returned: publisher first, then the watcher.
pub fn shutdown<P: Publisher>(publisher: &P, mut detector: ChangeDetector) {
    publisher.stop();
    detector.stop();
    detector.join();
    crate::debug!("serve"; "shutdown complete");
}
