//! Disposable database provisioning.
//!
//! # Responsibility
//! - Provide a throwaway SQLite file per test run.
//! - Hand out context options/factories bound to that file.
//!
//! # Invariants
//! - Each `ScratchDatabase` lives in its own fresh temporary directory.
//! - Dropping the value removes the directory and every file in it.

use super::DbResult;
use crate::context::{ContextFactory, ContextOptions};
use log::info;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCRATCH_DIR_PREFIX: &str = "calllog-scratch-";
const SCRATCH_DB_FILE: &str = "calllog.db";

/// A database file that exists only for the lifetime of this value.
#[derive(Debug)]
pub struct ScratchDatabase {
    dir: TempDir,
    path: PathBuf,
}

impl ScratchDatabase {
    /// Provisions a new empty database location.
    ///
    /// The file itself is created lazily by the first connection.
    pub fn start() -> DbResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir()?;
        let path = dir.path().join(SCRATCH_DB_FILE);
        info!(
            "event=scratch_db module=db status=ok action=start path={}",
            path.display()
        );
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &Path {
        self.dir.path()
    }

    /// Default context options pointing at this database.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions::new(&self.path)
    }

    /// Builds a pooled context factory with default options.
    pub fn factory(&self) -> DbResult<ContextFactory> {
        ContextFactory::new(self.context_options())
    }
}

impl Drop for ScratchDatabase {
    fn drop(&mut self) {
        info!(
            "event=scratch_db module=db status=ok action=dispose path={}",
            self.path.display()
        );
    }
}
