//! Ctrl-C cleanup for in-progress installs.
//!
//! Work directories live under the install root, so one left behind by an
//! interrupted run would stay there indefinitely. While a [`WorkdirGuard`] is
//! alive its directory is registered; a Ctrl-C removes every registered
//! directory and exits with [`INTERRUPTED_EXIT_CODE`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};

/// Exit status of a run interrupted by Ctrl-C (`128 + SIGINT`).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static ACTIVE: Registry = Registry::new();
static HANDLER: Once = Once::new();

/// Set of directories to remove on interrupt.
#[derive(Debug, Default)]
pub struct Registry {
    dirs: Mutex<Vec<PathBuf>>,
}

impl Registry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dirs: Mutex::new(Vec::new()),
        }
    }

    /// Registers `path` until the returned guard is dropped.
    #[must_use = "the directory is unregistered when the guard is dropped"]
    pub fn register(&self, path: &Path) -> WorkdirGuard<'_> {
        self.dirs().push(path.to_path_buf());
        WorkdirGuard {
            registry: self,
            path: path.to_path_buf(),
        }
    }

    /// Removes every registered directory and returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut removed = 0;
        for dir in self.dirs().drain(..) {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "failed to remove work directory");
                }
            }
        }
        removed
    }

    fn unregister(&self, path: &Path) {
        let mut dirs = self.dirs();
        if let Some(index) = dirs.iter().position(|dir| dir == path) {
            dirs.swap_remove(index);
        }
    }

    fn dirs(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a directory registered for removal on Ctrl-C.
#[derive(Debug)]
pub struct WorkdirGuard<'a> {
    registry: &'a Registry,
    path: PathBuf,
}

impl Drop for WorkdirGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(&self.path);
    }
}

/// Installs the process-wide Ctrl-C handler. Later calls do nothing.
///
/// Failure to install the handler is logged and otherwise ignored.
pub fn install_handler() {
    HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(on_interrupt) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    });
}

/// Registers `path` with the process-wide registry.
#[must_use = "the directory is unregistered when the guard is dropped"]
pub fn guard(path: &Path) -> WorkdirGuard<'static> {
    ACTIVE.register(path)
}

fn on_interrupt() {
    if ACTIVE.remove_all() > 0 {
        eprintln!("nibble install error: interrupted");
    }
    std::process::exit(INTERRUPTED_EXIT_CODE);
}
