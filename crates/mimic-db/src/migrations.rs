use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS authors (
            id             INTEGER PRIMARY KEY,
            external_id    TEXT NOT NULL UNIQUE,
            name           TEXT NOT NULL,
            discriminator  TEXT NOT NULL DEFAULT '',
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS channels (
            id                 INTEGER PRIMARY KEY,
            external_id        TEXT NOT NULL UNIQUE,
            guild_external_id  TEXT NOT NULL,
            created_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Timestamps are microseconds since the Unix epoch. external_id is
        -- NOT unique here: an edit inserts a successor row under the same
        -- external id, and only the superseded row gets edited_at stamped.
        CREATE TABLE IF NOT EXISTS messages (
            id                INTEGER PRIMARY KEY,
            content           TEXT NOT NULL,
            origin_timestamp  INTEGER NOT NULL,
            external_id       TEXT NOT NULL,
            channel_id        INTEGER NOT NULL REFERENCES channels(id),
            author_id         INTEGER NOT NULL REFERENCES authors(id),
            replayed_at       INTEGER,
            edited_at         INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_messages_origin
            ON messages(origin_timestamp);

        CREATE INDEX IF NOT EXISTS idx_messages_external
            ON messages(external_id);

        CREATE INDEX IF NOT EXISTS idx_messages_edited
            ON messages(edited_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
