// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history.

use kara_core::{ConversationTurn, KaraError};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn turn_from_row(row: &Row<'_>) -> Result<ConversationTurn, rusqlite::Error> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        prompt: row.get(2)?,
        response: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub async fn append_turn(
    db: &Database,
    session_id: &str,
    prompt: &str,
    response: &str,
) -> Result<ConversationTurn, KaraError> {
    let (session_id, prompt, response) =
        (session_id.to_string(), prompt.to_string(), response.to_string());
    db.connection()
        .call(move |conn| -> Result<ConversationTurn, rusqlite::Error> {
            conn.query_row(
                "INSERT INTO conversation_turns (session_id, prompt, response)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, session_id, prompt, response, created_at",
                params![session_id, prompt, response],
                turn_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// The latest `limit` turns of a session, returned oldest first.
pub async fn recent_turns(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<ConversationTurn>, KaraError> {
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut turns = db
        .connection()
        .call(move |conn| -> Result<Vec<ConversationTurn>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, prompt, response, created_at
                 FROM conversation_turns
                 WHERE session_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![session_id, limit], turn_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    turns.reverse();
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn recent_turns_are_bounded_and_chronological() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap(), true)
            .await
            .unwrap();

        for i in 1..=5 {
            append_turn(&db, "s1", &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }
        append_turn(&db, "other", "x", "y").await.unwrap();

        let turns = recent_turns(&db, "s1", 3).await.unwrap();
        let prompts: Vec<_> = turns.iter().map(|t| t.prompt.as_str()).collect();
        assert_eq!(prompts, ["q3", "q4", "q5"]);
    }

    #[tokio::test]
    async fn append_returns_stored_row() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap(), true)
            .await
            .unwrap();
        let turn = append_turn(&db, "s1", "hola", "ERROR: boom").await.unwrap();
        assert!(turn.id > 0);
        assert!(turn.is_error());
        assert!(turn.created_at.ends_with('Z'));
    }
}
