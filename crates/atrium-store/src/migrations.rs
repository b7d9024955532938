use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub(crate) fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS mailboxes (
            key     TEXT PRIMARY KEY,
            value   TEXT NOT NULL,
            version INTEGER NOT NULL
        );
        ",
    )?;

    info!("Store migrations complete");
    Ok(())
}
