//! Phone call repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist `phone_calls` rows together with their `phone_call_topics`.
//! - Load calls with the topic list attached.
//!
//! # Invariants
//! - Topics are written as a set: trimmed, deduplicated, one row per value.
//! - Topics are read back in insertion order.
//! - Call listing is ordered by `id ASC`.

use super::{assigned_id, RecordKind, RepoError, RepoResult};
use crate::model::caller::CallerId;
use crate::model::phone_call::{PhoneCall, PhoneCallId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PHONE_CALL_SELECT_SQL: &str = "SELECT
    id,
    call_time,
    phone_number,
    caller_id
FROM phone_calls";

/// Query options for listing phone calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneCallListQuery {
    /// Restrict to calls owned by this caller.
    pub caller_id: Option<CallerId>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for phone call persistence.
pub trait PhoneCallRepository {
    /// Inserts the call and its topics, writing the assigned id back.
    fn insert_phone_call(&self, call: &mut PhoneCall) -> RepoResult<PhoneCallId>;
    fn get_phone_call(&self, id: PhoneCallId) -> RepoResult<Option<PhoneCall>>;
    fn list_phone_calls(&self, query: &PhoneCallListQuery) -> RepoResult<Vec<PhoneCall>>;
    fn load_topics(&self, id: PhoneCallId) -> RepoResult<Vec<String>>;
}

/// SQLite-backed phone call repository.
pub struct SqlitePhoneCallRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePhoneCallRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PhoneCallRepository for SqlitePhoneCallRepository<'_> {
    fn insert_phone_call(&self, call: &mut PhoneCall) -> RepoResult<PhoneCallId> {
        call.validate()?;

        self.conn.execute(
            "INSERT INTO phone_calls (
                call_time,
                phone_number,
                caller_id
            ) VALUES (?1, ?2, ?3);",
            params![call.call_time, call.phone_number.as_str(), call.caller_id],
        )?;
        let id = assigned_id(self.conn.last_insert_rowid(), "phone_calls")?;

        let topics = call.normalized_topics();
        for topic in &topics {
            self.conn.execute(
                "INSERT OR IGNORE INTO phone_call_topics (phone_call_id, topic)
                 VALUES (?1, ?2);",
                params![id, topic.as_str()],
            )?;
        }

        call.id = Some(id);
        call.topics = topics;
        Ok(id)
    }

    fn get_phone_call(&self, id: PhoneCallId) -> RepoResult<Option<PhoneCall>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PHONE_CALL_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            let mut call = parse_phone_call_row(row)?;
            call.topics = load_topics(self.conn, id)?;
            return Ok(Some(call));
        }

        Ok(None)
    }

    fn list_phone_calls(&self, query: &PhoneCallListQuery) -> RepoResult<Vec<PhoneCall>> {
        let mut sql = format!("{PHONE_CALL_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(caller_id) = query.caller_id {
            sql.push_str(" AND caller_id = ?");
            bind_values.push(Value::Integer(caller_id));
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut calls = Vec::new();
        while let Some(row) = rows.next()? {
            calls.push(parse_phone_call_row(row)?);
        }

        for call in &mut calls {
            if let Some(id) = call.id {
                call.topics = load_topics(self.conn, id)?;
            }
        }

        Ok(calls)
    }

    fn load_topics(&self, id: PhoneCallId) -> RepoResult<Vec<String>> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM phone_calls WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound {
                kind: RecordKind::PhoneCall,
                id,
            });
        }
        load_topics(self.conn, id)
    }
}

fn load_topics(conn: &Connection, id: PhoneCallId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT topic
         FROM phone_call_topics
         WHERE phone_call_id = ?1
         ORDER BY rowid ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut topics = Vec::new();
    while let Some(row) = rows.next()? {
        topics.push(row.get::<_, String>(0)?);
    }
    Ok(topics)
}

fn parse_phone_call_row(row: &Row<'_>) -> RepoResult<PhoneCall> {
    let id: i64 = row.get("id")?;
    let call = PhoneCall {
        id: Some(assigned_id(id, "phone_calls")?),
        call_time: row.get("call_time")?,
        phone_number: row.get("phone_number")?,
        topics: Vec::new(),
        caller_id: row.get("caller_id")?,
    };
    if call.phone_number.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty phone_number in phone_calls row {id}"
        )));
    }
    Ok(call)
}
