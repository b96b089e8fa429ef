//! Caller repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist a caller together with the calls it owns.
//! - Load callers with their calls eagerly attached.
//!
//! # Invariants
//! - `insert_caller` writes the caller row first, then each owned call with
//!   `caller_id` pointing at it.
//! - Never opens its own transaction; the context wraps writes in a savepoint.

use super::phone_call_repo::{PhoneCallListQuery, PhoneCallRepository, SqlitePhoneCallRepository};
use super::{assigned_id, RepoError, RepoResult};
use crate::model::caller::{Caller, CallerId};
use rusqlite::{params, Connection, Row};

/// Repository interface for caller persistence.
pub trait CallerRepository {
    /// Inserts the caller graph and writes assigned ids back into it.
    fn insert_caller(&self, caller: &mut Caller) -> RepoResult<CallerId>;
    fn get_caller(&self, id: CallerId) -> RepoResult<Option<Caller>>;
    fn list_callers(&self) -> RepoResult<Vec<Caller>>;
    fn count_calls_for(&self, id: CallerId) -> RepoResult<u64>;
}

/// SQLite-backed caller repository.
pub struct SqliteCallerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCallerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn calls(&self) -> SqlitePhoneCallRepository<'conn> {
        SqlitePhoneCallRepository::new(self.conn)
    }

    fn attach_calls(&self, caller: &mut Caller) -> RepoResult<()> {
        caller.phone_calls = self.calls().list_phone_calls(&PhoneCallListQuery {
            caller_id: caller.id,
            ..PhoneCallListQuery::default()
        })?;
        Ok(())
    }
}

impl CallerRepository for SqliteCallerRepository<'_> {
    fn insert_caller(&self, caller: &mut Caller) -> RepoResult<CallerId> {
        caller.validate()?;

        self.conn.execute(
            "INSERT INTO callers (name) VALUES (?1);",
            params![caller.name.as_str()],
        )?;
        let id = assigned_id(self.conn.last_insert_rowid(), "callers")?;

        let calls = self.calls();
        for call in &mut caller.phone_calls {
            call.caller_id = Some(id);
            calls.insert_phone_call(call)?;
        }

        caller.id = Some(id);
        Ok(id)
    }

    fn get_caller(&self, id: CallerId) -> RepoResult<Option<Caller>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM callers WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            let mut caller = parse_caller_row(row)?;
            self.attach_calls(&mut caller)?;
            return Ok(Some(caller));
        }

        Ok(None)
    }

    fn list_callers(&self) -> RepoResult<Vec<Caller>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM callers ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut callers = Vec::new();
        while let Some(row) = rows.next()? {
            callers.push(parse_caller_row(row)?);
        }

        for caller in &mut callers {
            self.attach_calls(caller)?;
        }
        Ok(callers)
    }

    fn count_calls_for(&self, id: CallerId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM phone_calls WHERE caller_id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative call count `{count}`")))
    }
}

fn parse_caller_row(row: &Row<'_>) -> RepoResult<Caller> {
    let id: i64 = row.get("id")?;
    let name: String = row.get("name")?;
    if name.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty name in callers row {id}"
        )));
    }
    Ok(Caller {
        id: Some(assigned_id(id, "callers")?),
        name,
        phone_calls: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::{CallerRepository, SqliteCallerRepository};
    use crate::db::open_db_in_memory;
    use crate::model::caller::Caller;
    use crate::model::phone_call::PhoneCall;
    use crate::repo::RepoError;

    #[test]
    fn insert_caller_links_owned_calls() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCallerRepository::new(&conn);

        let mut caller = Caller::with_calls(
            "John Doe",
            vec![
                PhoneCall::new("123-456-7890", 2_000),
                PhoneCall::new("987-654-3210", 1_000),
            ],
        );
        let id = repo.insert_caller(&mut caller).unwrap();

        assert_eq!(caller.id, Some(id));
        assert!(caller
            .phone_calls
            .iter()
            .all(|call| call.caller_id == Some(id) && call.id.is_some()));
        assert_eq!(repo.count_calls_for(id).unwrap(), 2);

        let loaded = repo.get_caller(id).unwrap().unwrap();
        assert_eq!(loaded.name, "John Doe");
        assert_eq!(loaded.phone_calls.len(), 2);
        assert_eq!(loaded.phone_calls[0].phone_number, "123-456-7890");
    }

    #[test]
    fn get_missing_caller_returns_none() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCallerRepository::new(&conn);
        assert!(repo.get_caller(7).unwrap().is_none());
    }

    #[test]
    fn blank_name_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCallerRepository::new(&conn);
        let err = repo.insert_caller(&mut Caller::new(" ")).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert!(repo.list_callers().unwrap().is_empty());
    }

    #[test]
    fn reading_rejects_corrupted_caller_row() {
        let conn = open_db_in_memory().unwrap();
        conn.execute("INSERT INTO callers (name) VALUES ('');", [])
            .unwrap();
        let repo = SqliteCallerRepository::new(&conn);
        let err = repo.list_callers().unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
