//! Unit-of-work context over the caller/phone-call schema.
//!
//! # Responsibility
//! - Stage record graphs and flush them atomically with `save_changes`.
//! - Track saved and loaded records by id, resolving repeated reads to the
//!   tracked snapshot until tracking is cleared.
//! - Scope explicit transactions with a guard that rolls back on drop.
//!
//! # Invariants
//! - `save_changes` validates every pending record before writing any row.
//! - A failed save leaves storage untouched and the pending set intact.
//! - Storage calls fail with `Cancelled` once the context's token is set.

mod factory;
mod tracker;
mod transaction;

pub use factory::{ContextFactory, ContextOptions};
pub use transaction::ContextTransaction;

use crate::db::schema;
use crate::db::DbError;
use crate::model::caller::{Caller, CallerId};
use crate::model::phone_call::{PhoneCall, PhoneCallId};
use crate::repo::caller_repo::{CallerRepository, SqliteCallerRepository};
use crate::repo::phone_call_repo::{
    PhoneCallListQuery, PhoneCallRepository, SqlitePhoneCallRepository,
};
use crate::repo::RepoError;
use log::{error, info};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracker::{ChangeTracker, PendingEntry};

pub type ContextResult<T> = Result<T, ContextError>;

/// Error surfaced by context sessions.
#[derive(Debug)]
pub enum ContextError {
    Db(DbError),
    Repo(RepoError),
    /// The context's cancellation token was triggered before a storage call.
    Cancelled,
    /// `begin_transaction` was called while a transaction is open.
    TransactionAlreadyActive,
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::TransactionAlreadyActive => write!(f, "a transaction is already active"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Cancelled | Self::TransactionAlreadyActive => None,
        }
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for ContextError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ContextError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Cloneable cancellation flag shared between a test run and its contexts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Ids assigned by one `save_changes` call, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedChanges {
    pub caller_ids: Vec<CallerId>,
    /// Owned calls of each caller followed by standalone calls, as staged.
    pub phone_call_ids: Vec<PhoneCallId>,
    /// Caller, call and topic rows inserted.
    pub rows_written: usize,
}

/// One session over a pooled connection.
pub struct CallContext {
    conn: PooledConnection<SqliteConnectionManager>,
    tracker: ChangeTracker,
    cancellation: Option<CancellationToken>,
}

impl CallContext {
    fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self {
            conn,
            tracker: ChangeTracker::default(),
            cancellation: None,
        }
    }

    /// Binds a cancellation token checked before every storage call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Creates the schema if absent. Returns whether tables were created.
    pub fn ensure_created(&self) -> ContextResult<bool> {
        self.check_cancelled()?;
        Ok(schema::ensure_created(&self.conn)?)
    }

    /// Stages a caller and the calls it owns.
    pub fn add_caller(&mut self, caller: Caller) {
        self.tracker.stage(PendingEntry::Caller(caller));
    }

    /// Stages a standalone call.
    pub fn add_phone_call(&mut self, call: PhoneCall) {
        self.tracker.stage(PendingEntry::PhoneCall(call));
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.tracker.pending().is_empty()
    }

    /// Writes every staged record in one atomic unit.
    ///
    /// Runs inside a savepoint, so it nests under an explicit transaction
    /// and commits on its own otherwise.
    ///
    /// # Side effects
    /// - Assigned ids are written into the records, which become tracked.
    /// - Emits `save_changes` logging events.
    pub fn save_changes(&mut self) -> ContextResult<SavedChanges> {
        self.check_cancelled()?;
        for entry in self.tracker.pending() {
            let validation = match entry {
                PendingEntry::Caller(caller) => caller.validate(),
                PendingEntry::PhoneCall(call) => call.validate(),
            };
            validation.map_err(RepoError::from)?;
        }

        let mut entries = self.tracker.take_pending();
        if entries.is_empty() {
            return Ok(SavedChanges::default());
        }

        let started_at = Instant::now();
        info!(
            "event=save_changes module=context status=start entries={}",
            entries.len()
        );

        match write_entries(&mut self.conn, &mut entries) {
            Ok(saved) => {
                for entry in &entries {
                    match entry {
                        PendingEntry::Caller(caller) => self.tracker.attach_caller(caller),
                        PendingEntry::PhoneCall(call) => self.tracker.attach_phone_call(call),
                    }
                }
                info!(
                    "event=save_changes module=context status=ok duration_ms={} callers={} phone_calls={} rows={}",
                    started_at.elapsed().as_millis(),
                    saved.caller_ids.len(),
                    saved.phone_call_ids.len(),
                    saved.rows_written
                );
                Ok(saved)
            }
            Err(err) => {
                error!(
                    "event=save_changes module=context status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                entries.iter_mut().for_each(forget_assigned_ids);
                self.tracker.restore_pending(entries);
                Err(err)
            }
        }
    }

    /// Loads every call with its topics, ordered by id.
    pub fn phone_calls(&mut self) -> ContextResult<Vec<PhoneCall>> {
        self.query_phone_calls(&PhoneCallListQuery::default())
    }

    pub fn query_phone_calls(
        &mut self,
        query: &PhoneCallListQuery,
    ) -> ContextResult<Vec<PhoneCall>> {
        self.check_cancelled()?;
        let loaded = SqlitePhoneCallRepository::new(&self.conn).list_phone_calls(query)?;
        Ok(loaded
            .into_iter()
            .map(|call| self.tracker.resolve_phone_call(call))
            .collect())
    }

    /// Returns the tracked call, or loads it from storage.
    pub fn find_phone_call(&mut self, id: PhoneCallId) -> ContextResult<Option<PhoneCall>> {
        if let Some(tracked) = self.tracker.phone_call(id) {
            return Ok(Some(tracked.clone()));
        }
        self.check_cancelled()?;
        let loaded = SqlitePhoneCallRepository::new(&self.conn).get_phone_call(id)?;
        Ok(loaded.map(|call| self.tracker.resolve_phone_call(call)))
    }

    /// Loads every caller with its calls eagerly attached.
    pub fn callers(&mut self) -> ContextResult<Vec<Caller>> {
        self.check_cancelled()?;
        let loaded = SqliteCallerRepository::new(&self.conn).list_callers()?;
        Ok(loaded
            .into_iter()
            .map(|caller| self.tracker.resolve_caller(caller))
            .collect())
    }

    /// Loads one caller; tracked fields and tracked calls win over storage.
    ///
    /// Always reads the call list from storage so it reflects every call
    /// saved with this `caller_id`.
    pub fn find_caller(&mut self, id: CallerId) -> ContextResult<Option<Caller>> {
        self.check_cancelled()?;
        let loaded = SqliteCallerRepository::new(&self.conn).get_caller(id)?;
        Ok(loaded.map(|caller| self.tracker.resolve_caller(caller)))
    }

    pub fn tracked_phone_call(&self, id: PhoneCallId) -> Option<&PhoneCall> {
        self.tracker.phone_call(id)
    }

    /// Mutable access to a tracked snapshot. Edits are in-memory only.
    pub fn tracked_phone_call_mut(&mut self, id: PhoneCallId) -> Option<&mut PhoneCall> {
        self.tracker.phone_call_mut(id)
    }

    /// In-memory view of a tracked caller and its tracked calls.
    pub fn tracked_caller(&self, id: CallerId) -> Option<Caller> {
        self.tracker.caller(id)
    }

    /// Number of tracked `(callers, phone_calls)`.
    pub fn tracked_counts(&self) -> (usize, usize) {
        self.tracker.tracked_counts()
    }

    /// Detaches every tracked and pending record.
    pub fn clear_tracking(&mut self) {
        let (callers, phone_calls) = self.tracker.tracked_counts();
        self.tracker.clear();
        info!(
            "event=tracking_clear module=context status=ok callers={callers} phone_calls={phone_calls}"
        );
    }

    /// Opens an explicit transaction scoped to the returned guard.
    pub fn begin_transaction(&mut self) -> ContextResult<ContextTransaction<'_>> {
        self.check_cancelled()?;
        if !self.conn.is_autocommit() {
            return Err(ContextError::TransactionAlreadyActive);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        info!("event=tx_begin module=context status=ok");
        Ok(ContextTransaction::new(self))
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Underlying connection for ad-hoc SQL.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn check_cancelled(&self) -> ContextResult<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(ContextError::Cancelled),
            _ => Ok(()),
        }
    }
}

fn write_entries(
    conn: &mut Connection,
    entries: &mut [PendingEntry],
) -> ContextResult<SavedChanges> {
    let savepoint = conn.savepoint()?;
    let mut saved = SavedChanges::default();
    {
        let callers = SqliteCallerRepository::new(&savepoint);
        let calls = SqlitePhoneCallRepository::new(&savepoint);
        for entry in entries.iter_mut() {
            match entry {
                PendingEntry::Caller(caller) => {
                    saved.caller_ids.push(callers.insert_caller(caller)?);
                    saved.rows_written += 1;
                    for call in &caller.phone_calls {
                        saved.phone_call_ids.extend(call.id);
                        saved.rows_written += 1 + call.topics.len();
                    }
                }
                PendingEntry::PhoneCall(call) => {
                    saved.phone_call_ids.push(calls.insert_phone_call(call)?);
                    saved.rows_written += 1 + call.topics.len();
                }
            }
        }
    }
    savepoint.commit()?;
    Ok(saved)
}

fn forget_assigned_ids(entry: &mut PendingEntry) {
    match entry {
        PendingEntry::Caller(caller) => {
            caller.id = None;
            for call in &mut caller.phone_calls {
                call.id = None;
                call.caller_id = None;
            }
        }
        PendingEntry::PhoneCall(call) => call.id = None,
    }
}
