use crate::Database;
use crate::models::{AuthorRow, ChannelRow, MessageRow};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

impl Database {
    // -- Channels --

    /// Opt a channel into indexing. Find-or-create: a concurrent creator
    /// winning the insert race is treated as success and re-fetched.
    pub fn index_channel(&self, external_id: &str, guild_external_id: &str) -> Result<ChannelRow> {
        self.with_conn_mut(|conn| {
            if let Some(row) = query_channel(conn, external_id)? {
                return Ok(row);
            }

            let inserted = conn.execute(
                "INSERT INTO channels (external_id, guild_external_id) VALUES (?1, ?2)",
                params![external_id, guild_external_id],
            );
            match inserted {
                Ok(_) => {}
                // Unique violation: another writer created the row between
                // our find and our insert. Fall through to the re-fetch.
                Err(e) if is_unique_violation(&e) => {}
                Err(e) => return Err(e.into()),
            }

            query_channel(conn, external_id)?
                .ok_or_else(|| anyhow!("channel {} missing after upsert", external_id))
        })
    }

    pub fn channel_by_external_id(&self, external_id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, external_id))
    }

    // -- Authors --

    /// Find-or-create with the same unique-constraint backstop as channels.
    pub fn upsert_author(
        &self,
        external_id: &str,
        name: &str,
        discriminator: &str,
    ) -> Result<AuthorRow> {
        self.with_conn_mut(|conn| {
            if let Some(row) = query_author(conn, external_id)? {
                return Ok(row);
            }

            let inserted = conn.execute(
                "INSERT INTO authors (external_id, name, discriminator) VALUES (?1, ?2, ?3)",
                params![external_id, name, discriminator],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {}
                Err(e) => return Err(e.into()),
            }

            query_author(conn, external_id)?
                .ok_or_else(|| anyhow!("author {} missing after upsert", external_id))
        })
    }

    // -- Messages --

    /// The originally ingested record for an external id, if any. Successor
    /// rows created by edits share the external id but have higher row ids.
    pub fn original_message_by_external_id(&self, external_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            query_message_where(conn, "m.external_id = ?1 ORDER BY m.id ASC", params![external_id])
        })
    }

    /// All records sharing an external id, in creation order: the original
    /// first, then each edit successor.
    pub fn messages_by_external_id(&self, external_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE m.external_id = ?1 ORDER BY m.id ASC", MESSAGE_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![external_id], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_message(
        &self,
        content: &str,
        origin_micros: i64,
        external_id: &str,
        channel_id: i64,
        author_id: i64,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (content, origin_timestamp, external_id, channel_id, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![content, origin_micros, external_id, channel_id, author_id],
            )?;
            let id = conn.last_insert_rowid();
            query_message_by_id(conn, id)?
                .ok_or_else(|| anyhow!("message {} missing after insert", id))
        })
    }

    /// Record an edit as a new historical record.
    ///
    /// One transaction covers both writes: insert a successor row carrying
    /// the edited content under the same external id / channel / author, and
    /// stamp edited_at on the superseded row. Returns `None` when no record
    /// with that external id was ever archived.
    pub fn reconcile_edit(
        &self,
        external_id: &str,
        content: &str,
        edited_micros: i64,
    ) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            // IMMEDIATE takes the write lock up front, so concurrent edits of
            // the same external id serialize at the store.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing = match query_message_where(
                &tx,
                "m.external_id = ?1 ORDER BY m.id DESC",
                params![external_id],
            )? {
                Some(row) => row,
                None => return Ok(None),
            };

            tx.execute(
                "INSERT INTO messages (content, origin_timestamp, external_id, channel_id, author_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![content, edited_micros, external_id, existing.channel_id, existing.author_id],
            )?;
            let successor_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE messages SET edited_at = ?1 WHERE id = ?2",
                params![edited_micros, existing.id],
            )?;

            let successor = query_message_by_id(&tx, successor_id)?
                .ok_or_else(|| anyhow!("successor {} missing after insert", successor_id))?;

            tx.commit()?;
            Ok(Some(successor))
        })
    }

    /// Replay candidates: the author's un-replayed, un-edited messages in
    /// origin-timestamp order, optionally scoped to one channel.
    pub fn replay_candidates(
        &self,
        author_external_id: &str,
        channel_external_id: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "{} WHERE a.external_id = ?1
                   AND m.replayed_at IS NULL
                   AND m.edited_at IS NULL",
                MESSAGE_SELECT
            );
            if channel_external_id.is_some() {
                sql.push_str(" AND c.external_id = ?2");
            }
            sql.push_str(" ORDER BY m.origin_timestamp ASC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = match channel_external_id {
                Some(channel) => stmt
                    .query_map(params![author_external_id, channel], map_message_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map(params![author_external_id], map_message_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
    }

    /// Timestamps of messages in a channel from anyone but the given author,
    /// within [start, end] inclusive, ascending. One call covers a whole
    /// segmentation window; the strictly-between test happens in memory.
    pub fn foreign_timestamps_between(
        &self,
        channel_id: i64,
        author_id: i64,
        start_micros: i64,
        end_micros: i64,
    ) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT origin_timestamp FROM messages
                 WHERE channel_id = ?1
                   AND author_id != ?2
                   AND origin_timestamp >= ?3
                   AND origin_timestamp <= ?4
                 ORDER BY origin_timestamp ASC",
            )?;
            let rows = stmt
                .query_map(
                    params![channel_id, author_id, start_micros, end_micros],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_replayed(&self, message_id: i64, replayed_micros: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE messages SET replayed_at = ?1 WHERE id = ?2",
                params![replayed_micros, message_id],
            )?;
            Ok(())
        })
    }

    /// The oldest archived message in a channel, used as the highwater
    /// anchor for backfilling further into history.
    pub fn earliest_message_in_channel(&self, channel_id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            query_message_where(
                conn,
                "m.channel_id = ?1 ORDER BY m.origin_timestamp ASC",
                params![channel_id],
            )
        })
    }
}

const MESSAGE_SELECT: &str = "SELECT m.id, m.content, m.origin_timestamp, m.external_id,
        m.channel_id, m.author_id, c.external_id, a.external_id,
        m.replayed_at, m.edited_at
 FROM messages m
 JOIN channels c ON c.id = m.channel_id
 JOIN authors a ON a.id = m.author_id";

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        content: row.get(1)?,
        origin_micros: row.get(2)?,
        external_id: row.get(3)?,
        channel_id: row.get(4)?,
        author_id: row.get(5)?,
        channel_external_id: row.get(6)?,
        author_external_id: row.get(7)?,
        replayed_micros: row.get(8)?,
        edited_micros: row.get(9)?,
    })
}

fn query_message_where(
    conn: &Connection,
    tail: &str,
    params: impl rusqlite::Params,
) -> Result<Option<MessageRow>> {
    let sql = format!("{} WHERE {} LIMIT 1", MESSAGE_SELECT, tail);
    let row = conn
        .prepare(&sql)?
        .query_row(params, map_message_row)
        .optional()?;
    Ok(row)
}

fn query_message_by_id(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    query_message_where(conn, "m.id = ?1", params![id])
}

fn query_channel(conn: &Connection, external_id: &str) -> Result<Option<ChannelRow>> {
    let row = conn
        .prepare("SELECT id, external_id, guild_external_id FROM channels WHERE external_id = ?1")?
        .query_row([external_id], |row| {
            Ok(ChannelRow {
                id: row.get(0)?,
                external_id: row.get(1)?,
                guild_external_id: row.get(2)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_author(conn: &Connection, external_id: &str) -> Result<Option<AuthorRow>> {
    let row = conn
        .prepare("SELECT id, external_id, name, discriminator FROM authors WHERE external_id = ?1")?
        .query_row([external_id], |row| {
            Ok(AuthorRow {
                id: row.get(0)?,
                external_id: row.get(1)?,
                name: row.get(2)?,
                discriminator: row.get(3)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
