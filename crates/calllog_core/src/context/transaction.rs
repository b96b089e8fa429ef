//! Explicit transaction guard for a `CallContext`.
//!
//! # Invariants
//! - A guard that is dropped without `commit` rolls back.
//! - Rolling back clears tracking, since tracked ids may no longer exist.

use super::{CallContext, ContextResult};
use log::{info, warn};
use std::ops::{Deref, DerefMut};

/// Open transaction on a context. Derefs to the context it borrows.
pub struct ContextTransaction<'ctx> {
    context: &'ctx mut CallContext,
    finished: bool,
}

impl<'ctx> ContextTransaction<'ctx> {
    pub(super) fn new(context: &'ctx mut CallContext) -> Self {
        Self {
            context,
            finished: false,
        }
    }

    /// Commits. On failure the guard still rolls back when dropped.
    pub fn commit(mut self) -> ContextResult<()> {
        self.context.conn.execute_batch("COMMIT;")?;
        self.finished = true;
        info!("event=tx_commit module=context status=ok");
        Ok(())
    }

    pub fn rollback(mut self) -> ContextResult<()> {
        self.finished = true;
        self.roll_back_inner()
    }

    fn roll_back_inner(&mut self) -> ContextResult<()> {
        self.context.tracker.clear();
        if !self.context.conn.is_autocommit() {
            self.context.conn.execute_batch("ROLLBACK;")?;
        }
        info!("event=tx_rollback module=context status=ok");
        Ok(())
    }
}

impl Deref for ContextTransaction<'_> {
    type Target = CallContext;

    fn deref(&self) -> &Self::Target {
        &*self.context
    }
}

impl DerefMut for ContextTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.context
    }
}

impl Drop for ContextTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.roll_back_inner() {
            warn!("event=tx_rollback module=context status=error error={err}");
        }
    }
}
