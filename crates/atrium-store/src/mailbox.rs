//! Per-recipient message lists stored as JSON blobs.
//!
//! Each staff member's mailbox is a single row: the whole list is read and
//! written as a unit under key `staff_<id>`. Every row carries an integer
//! version; a save supplies the version it read and fails on mismatch, so
//! a concurrent writer to the same database file cannot silently drop an
//! update.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use atrium_types::models::{MessageRecord, SeedRecord};

use crate::{Store, StoreError};

const KEY_PREFIX: &str = "staff_";

/// How many times a read-modify-write cycle re-reads after losing a
/// version race to another writer.
const WRITE_ATTEMPTS: usize = 3;

/// Storage key for a recipient's mailbox.
pub fn mailbox_key(recipient_id: &str) -> String {
    format!("{KEY_PREFIX}{recipient_id}")
}

struct Mailbox {
    records: Vec<MessageRecord>,
    version: i64,
}

impl Store {
    /// The recipient's stored list in insertion order, newest last. An
    /// absent mailbox is an empty list.
    pub fn load_list(&self, recipient_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        self.with_conn(|conn| Ok(read_mailbox(conn, &mailbox_key(recipient_id))?.records))
    }

    /// Version token of the recipient's stored list (0 when absent).
    pub fn list_version(&self, recipient_id: &str) -> Result<i64, StoreError> {
        self.with_conn(|conn| Ok(read_mailbox(conn, &mailbox_key(recipient_id))?.version))
    }

    /// Replace the stored list wholesale. `expected_version` must be the
    /// version the caller read; on mismatch nothing is written and
    /// [`StoreError::Conflict`] is returned. Returns the new version.
    pub fn save_list(
        &self,
        recipient_id: &str,
        records: &[MessageRecord],
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            write_mailbox(conn, &mailbox_key(recipient_id), records, expected_version)
        })
    }

    /// Append one record to its recipient's list.
    pub fn append_message(&self, record: &MessageRecord) -> Result<(), StoreError> {
        self.update_mailbox(&record.recipient_id, |records| {
            records.push(record.clone());
        })
    }

    /// Merge a seed dataset into the store.
    ///
    /// Seeds with an empty body are skipped, as is any seed whose
    /// (sender, body) pair already exists in the recipient's list, so the
    /// merge is idempotent for identical seed content. Seeds without a
    /// timestamp get the current time. Returns how many records were
    /// imported.
    pub fn import_seed(&self, seeds: &[SeedRecord]) -> Result<usize, StoreError> {
        let mut imported = 0;
        for seed in seeds {
            if seed.body.trim().is_empty() {
                continue;
            }
            let added = self.update_mailbox(&seed.recipient_id, |records| {
                let duplicate = records
                    .iter()
                    .any(|m| m.sender_id == seed.sender_id && m.body == seed.body);
                if duplicate {
                    return false;
                }
                records.push(MessageRecord {
                    sender_id: seed.sender_id.clone(),
                    recipient_id: seed.recipient_id.clone(),
                    body: seed.body.clone(),
                    response: seed.response.clone(),
                    created_at: seed.created_at.unwrap_or_else(Utc::now),
                });
                true
            })?;
            if added {
                imported += 1;
            }
        }
        Ok(imported)
    }

    /// Set the response on the first record matching (sender, created_at).
    /// Returns whether a record was updated; with no match the list
    /// round-trips unchanged.
    pub fn save_response(
        &self,
        recipient_id: &str,
        sender_id: &str,
        created_at: DateTime<Utc>,
        response: &str,
    ) -> Result<bool, StoreError> {
        self.update_mailbox(recipient_id, |records| {
            match records
                .iter_mut()
                .find(|m| m.sender_id == sender_id && m.created_at == created_at)
            {
                Some(record) => {
                    record.response = response.to_string();
                    true
                }
                None => false,
            }
        })
    }

    /// Identification numbers that own a stored mailbox, in key order.
    pub fn recipients(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM mailboxes ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys
                .iter()
                .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
                .collect())
        })
    }

    /// Every stored record across all mailboxes, mailboxes in key order
    /// and records in stored order.
    pub fn all_messages(&self) -> Result<Vec<MessageRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM mailboxes ORDER BY key")?;
            let blobs = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;

            let mut all = Vec::new();
            for blob in blobs {
                let records: Vec<MessageRecord> = serde_json::from_str(&blob)?;
                all.extend(records);
            }
            Ok(all)
        })
    }

    /// Read-modify-write one mailbox under its version token, re-reading a
    /// bounded number of times when another writer races the save.
    fn update_mailbox<T>(
        &self,
        recipient_id: &str,
        mut apply: impl FnMut(&mut Vec<MessageRecord>) -> T,
    ) -> Result<T, StoreError> {
        let key = mailbox_key(recipient_id);
        for _ in 0..WRITE_ATTEMPTS {
            let written = self.with_conn(|conn| {
                let mut mailbox = read_mailbox(conn, &key)?;
                let out = apply(&mut mailbox.records);
                match write_mailbox(conn, &key, &mailbox.records, mailbox.version) {
                    Ok(_) => Ok(Some(out)),
                    Err(StoreError::Conflict { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })?;
            if let Some(out) = written {
                return Ok(out);
            }
        }
        Err(StoreError::Conflict { key })
    }
}

fn read_mailbox(conn: &Connection, key: &str) -> Result<Mailbox, StoreError> {
    let row = conn
        .query_row(
            "SELECT value, version FROM mailboxes WHERE key = ?1",
            [key],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    match row {
        Some((value, version)) => Ok(Mailbox {
            records: serde_json::from_str(&value)?,
            version,
        }),
        None => Ok(Mailbox {
            records: Vec::new(),
            version: 0,
        }),
    }
}

fn write_mailbox(
    conn: &Connection,
    key: &str,
    records: &[MessageRecord],
    expected_version: i64,
) -> Result<i64, StoreError> {
    let value = serde_json::to_string(records)?;

    if expected_version == 0 {
        let inserted = conn.execute(
            "INSERT INTO mailboxes (key, value, version) VALUES (?1, ?2, 1)
             ON CONFLICT(key) DO NOTHING",
            rusqlite::params![key, value],
        )?;
        if inserted == 1 {
            return Ok(1);
        }
        // A row appeared since the read; fall through so the version
        // check below reports the conflict.
    }

    let updated = conn.execute(
        "UPDATE mailboxes SET value = ?2, version = version + 1
         WHERE key = ?1 AND version = ?3",
        rusqlite::params![key, value, expected_version],
    )?;
    if updated == 1 {
        Ok(expected_version + 1)
    } else {
        Err(StoreError::Conflict {
            key: key.to_string(),
        })
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn record(sender: &str, recipient: &str, body: &str, secs: i64) -> MessageRecord {
        MessageRecord {
            sender_id: sender.to_string(),
            recipient_id: recipient.to_string(),
            body: body.to_string(),
            response: String::new(),
            created_at: at(secs),
        }
    }

    fn seed(sender: &str, recipient: &str, body: &str) -> SeedRecord {
        SeedRecord {
            sender_id: sender.to_string(),
            recipient_id: recipient.to_string(),
            recipient_name: String::new(),
            body: body.to_string(),
            response: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn absent_mailbox_is_an_empty_list() {
        let store = store();
        assert!(store.load_list("2300492").unwrap().is_empty());
        assert_eq!(store.list_version("2300492").unwrap(), 0);
    }

    #[test]
    fn append_preserves_submission_order() {
        let store = store();
        for i in 0..5 {
            store
                .append_message(&record("2300492", "B", &format!("note {i}"), 100 + i))
                .unwrap();
        }

        let list = store.load_list("B").unwrap();
        assert_eq!(list.len(), 5);
        for (i, msg) in list.iter().enumerate() {
            assert_eq!(msg.body, format!("note {i}"));
        }
    }

    #[test]
    fn save_list_bumps_the_version() {
        let store = store();
        let v1 = store.save_list("B", &[record("A", "B", "hi", 1)], 0).unwrap();
        assert_eq!(v1, 1);
        let v2 = store.save_list("B", &[], v1).unwrap();
        assert_eq!(v2, 2);
        assert!(store.load_list("B").unwrap().is_empty());
    }

    #[test]
    fn save_list_rejects_a_stale_version() {
        let store = store();
        store.save_list("B", &[record("A", "B", "hi", 1)], 0).unwrap();

        let err = store.save_list("B", &[], 0).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        // The stale write left the list untouched.
        assert_eq!(store.load_list("B").unwrap().len(), 1);
    }

    #[test]
    fn import_seed_twice_keeps_a_single_entry() {
        let store = store();
        let seeds = vec![seed("A", "B", "hi")];

        assert_eq!(store.import_seed(&seeds).unwrap(), 1);
        assert_eq!(store.import_seed(&seeds).unwrap(), 0);

        let list = store.load_list("B").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].sender_id, "A");
        assert_eq!(list[0].body, "hi");
    }

    #[test]
    fn import_seed_skips_empty_bodies() {
        let store = store();
        let seeds = vec![seed("A", "B", ""), seed("A", "B", "   ")];
        assert_eq!(store.import_seed(&seeds).unwrap(), 0);
        assert!(store.load_list("B").unwrap().is_empty());
    }

    #[test]
    fn import_seed_keeps_distinct_messages_from_one_sender() {
        let store = store();
        let seeds = vec![seed("A", "B", "hi"), seed("A", "B", "bye")];
        assert_eq!(store.import_seed(&seeds).unwrap(), 2);
        assert_eq!(store.load_list("B").unwrap().len(), 2);
    }

    #[test]
    fn import_seed_assigns_a_timestamp_when_missing() {
        let store = store();
        store.import_seed(&[seed("A", "B", "hi")]).unwrap();

        let list = store.load_list("B").unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].created_at > at(0));
    }

    #[test]
    fn import_seed_respects_existing_appends() {
        let store = store();
        store.append_message(&record("A", "B", "hi", 10)).unwrap();

        // Same (sender, body) pair as the live record: not re-imported.
        assert_eq!(store.import_seed(&[seed("A", "B", "hi")]).unwrap(), 0);
        assert_eq!(store.load_list("B").unwrap().len(), 1);
    }

    #[test]
    fn save_response_updates_only_the_target() {
        let store = store();
        store.append_message(&record("A", "B", "hi", 10)).unwrap();
        store.append_message(&record("C", "B", "hello", 20)).unwrap();
        let before = store.load_list("B").unwrap();

        let updated = store.save_response("B", "A", at(10), "thanks").unwrap();
        assert!(updated);

        let after = store.load_list("B").unwrap();
        assert_eq!(after[0].response, "thanks");
        assert!(after[0].is_answered());
        // Everything else round-trips unchanged, order included.
        assert_eq!(after[1], before[1]);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn save_response_overwrites_without_duplicating() {
        let store = store();
        store.append_message(&record("A", "B", "hi", 10)).unwrap();

        assert!(store.save_response("B", "A", at(10), "thanks").unwrap());
        assert!(store.save_response("B", "A", at(10), "thanks v2").unwrap());

        let list = store.load_list("B").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].response, "thanks v2");
    }

    #[test]
    fn save_response_without_a_match_is_a_no_op() {
        let store = store();
        store.append_message(&record("A", "B", "hi", 10)).unwrap();
        let before = store.load_list("B").unwrap();

        // Wrong timestamp, then wrong sender.
        assert!(!store.save_response("B", "A", at(11), "thanks").unwrap());
        assert!(!store.save_response("B", "X", at(10), "thanks").unwrap());

        assert_eq!(store.load_list("B").unwrap(), before);
    }

    #[test]
    fn corrupt_blob_surfaces_as_a_parse_error() {
        let store = store();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO mailboxes (key, value, version) VALUES ('staff_B', 'not json', 1)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let err = store.load_list("B").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn recipients_and_all_messages_span_mailboxes() {
        let store = store();
        store.append_message(&record("A", "2300492", "hi", 10)).unwrap();
        store.append_message(&record("A", "2301177", "hello", 20)).unwrap();
        store.append_message(&record("C", "2300492", "hey", 30)).unwrap();

        assert_eq!(store.recipients().unwrap(), vec!["2300492", "2301177"]);

        let all = store.all_messages().unwrap();
        assert_eq!(all.len(), 3);
        // Key order first, stored order within a mailbox.
        assert_eq!(all[0].body, "hi");
        assert_eq!(all[1].body, "hey");
        assert_eq!(all[2].body, "hello");
    }
}
