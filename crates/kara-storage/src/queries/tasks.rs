// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task ledger operations.
//!
//! Status changes share one shape: load the row inside a transaction, check
//! the lifecycle allows the move, apply the update, re-read and commit.

use std::str::FromStr;

use kara_core::{EmailTask, KaraError, NewEmailTask, TaskStatus};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::database::{Database, map_tr_err};
use crate::queries::{MAX_ERROR_CHARS, truncate_chars};

const TASK_COLUMNS: &str = "id, uid, sender_email, subject, body, status, attempts, max_attempts,
     response, error_message, created_at, last_attempt_at, processed_at";

fn task_from_row(row: &Row<'_>) -> Result<EmailTask, rusqlite::Error> {
    let status: String = row.get(5)?;
    let status = TaskStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(EmailTask {
        id: row.get(0)?,
        uid: row.get(1)?,
        sender_email: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        status,
        attempts: row.get(6)?,
        max_attempts: row.get(7)?,
        response: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
        last_attempt_at: row.get(11)?,
        processed_at: row.get(12)?,
    })
}

fn select_by_id(conn: &Connection, id: i64) -> Result<Option<EmailTask>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM email_tasks WHERE id = ?1"),
        params![id],
        task_from_row,
    )
    .optional()
}

fn select_by_uid(conn: &Connection, uid: &str) -> Result<Option<EmailTask>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM email_tasks WHERE uid = ?1"),
        params![uid],
        task_from_row,
    )
    .optional()
}

/// Registers a message as a pending task. A uid seen before returns the
/// existing row untouched.
pub async fn create_task(db: &Database, task: &NewEmailTask) -> Result<EmailTask, KaraError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| -> Result<EmailTask, rusqlite::Error> {
            conn.execute(
                "INSERT INTO email_tasks (uid, sender_email, subject, body, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(uid) DO NOTHING",
                params![
                    task.uid,
                    task.sender_email,
                    task.subject,
                    task.body,
                    task.max_attempts
                ],
            )?;
            select_by_uid(conn, &task.uid)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_task_by_uid(db: &Database, uid: &str) -> Result<Option<EmailTask>, KaraError> {
    let uid = uid.to_string();
    db.connection()
        .call(move |conn| select_by_uid(conn, &uid))
        .await
        .map_err(map_tr_err)
}

pub async fn get_task(db: &Database, id: i64) -> Result<Option<EmailTask>, KaraError> {
    db.connection()
        .call(move |conn| select_by_id(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Newest tasks first.
pub async fn list_tasks(
    db: &Database,
    status: Option<TaskStatus>,
    limit: usize,
) -> Result<Vec<EmailTask>, KaraError> {
    let status = status.map(|s| s.to_string());
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<EmailTask>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM email_tasks
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit], task_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Validates and applies one status change atomically.
async fn transition<F>(
    db: &Database,
    id: i64,
    to: TaskStatus,
    apply: F,
) -> Result<EmailTask, KaraError>
where
    F: FnOnce(&Transaction<'_>, &EmailTask) -> Result<(), rusqlite::Error> + Send + 'static,
{
    db.connection()
        .call(
            move |conn| -> Result<Result<EmailTask, KaraError>, rusqlite::Error> {
                let tx = conn.transaction()?;
                let Some(current) = select_by_id(&tx, id)? else {
                    return Ok(Err(KaraError::TaskNotFound(id)));
                };
                if !current.status.can_transition_to(to) {
                    return Ok(Err(KaraError::InvalidTransition {
                        task_id: id,
                        from: current.status,
                        to,
                    }));
                }
                apply(&tx, &current)?;
                let updated = select_by_id(&tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                tx.commit()?;
                Ok(Ok(updated))
            },
        )
        .await
        .map_err(map_tr_err)?
}

/// Claims a task for an attempt: `processing` or `reprocessing`, attempts + 1.
pub async fn begin_attempt(
    db: &Database,
    id: i64,
    status: TaskStatus,
) -> Result<EmailTask, KaraError> {
    if !matches!(status, TaskStatus::Processing | TaskStatus::Reprocessing) {
        return Err(KaraError::Internal(format!(
            "begin_attempt expects processing or reprocessing, got {status}"
        )));
    }
    let label = status.to_string();
    transition(db, id, status, move |tx, _| {
        tx.execute(
            "UPDATE email_tasks
             SET status = ?1,
                 attempts = attempts + 1,
                 last_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?2",
            params![label, id],
        )?;
        Ok(())
    })
    .await
}

/// Marks a task done and records the exchange in the sender's history.
pub async fn complete_task(db: &Database, id: i64, response: &str) -> Result<EmailTask, KaraError> {
    let response = response.to_string();
    transition(db, id, TaskStatus::Done, move |tx, task| {
        tx.execute(
            "UPDATE email_tasks
             SET status = 'done',
                 response = ?1,
                 error_message = NULL,
                 processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?2",
            params![response, id],
        )?;
        tx.execute(
            "INSERT INTO conversation_turns (session_id, prompt, response) VALUES (?1, ?2, ?3)",
            params![task.sender_email, task.body, response],
        )?;
        Ok(())
    })
    .await
}

/// Returns a failed attempt to `pending` so a later run retries it.
pub async fn release_task(db: &Database, id: i64, error: &str) -> Result<EmailTask, KaraError> {
    let error = truncate_chars(error, MAX_ERROR_CHARS);
    transition(db, id, TaskStatus::Pending, move |tx, _| {
        tx.execute(
            "UPDATE email_tasks SET status = 'pending', error_message = ?1 WHERE id = ?2",
            params![error, id],
        )?;
        Ok(())
    })
    .await
}

/// Abandons a task. Never retried automatically afterwards.
pub async fn dead_letter_task(db: &Database, id: i64, reason: &str) -> Result<EmailTask, KaraError> {
    let reason = truncate_chars(reason, MAX_ERROR_CHARS);
    transition(db, id, TaskStatus::DeadLetter, move |tx, _| {
        tx.execute(
            "UPDATE email_tasks
             SET status = 'dead_letter',
                 error_message = ?1,
                 processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?2",
            params![reason, id],
        )?;
        Ok(())
    })
    .await
}

/// Ends a manual reprocess that could not produce a reply.
pub async fn fail_task(
    db: &Database,
    id: i64,
    response: &str,
    error: &str,
) -> Result<EmailTask, KaraError> {
    let response = response.to_string();
    let error = truncate_chars(error, MAX_ERROR_CHARS);
    transition(db, id, TaskStatus::Failed, move |tx, _| {
        tx.execute(
            "UPDATE email_tasks SET status = 'failed', response = ?1, error_message = ?2
             WHERE id = ?3",
            params![response, error, id],
        )?;
        Ok(())
    })
    .await
}
