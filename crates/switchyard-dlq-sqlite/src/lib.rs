//! SQLite-backed dead-letter queue. Keeps the message bytes, reason, and
//! insertion timestamp for every entry, so entries survive process
//! restarts and can be queried back out.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use switchyard_core::dlq::{Dlq, DlqEntry};
use switchyard_core::message::{Message, MessageId};
use switchyard_core::SwitchyardError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    message_id BLOB PRIMARY KEY,
    message_bytes BLOB NOT NULL,
    reason TEXT NOT NULL,
    inserted TEXT NOT NULL
);";

pub struct SqliteDlq {
    connection: Connection,
}

impl SqliteDlq {
    pub fn open(connection_str: &str) -> Result<Self, rusqlite::Error> {
        let connection = Connection::open(connection_str)?;
        connection.execute(SCHEMA, [])?;
        Ok(Self { connection })
    }

    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        let connection = Connection::open_in_memory()?;
        connection.execute(SCHEMA, [])?;
        Ok(Self { connection })
    }

    /// The most-recently-inserted entry still present, if any.
    pub fn oldest(&self) -> Result<Option<(DlqEntry, DateTime<Utc>)>, rusqlite::Error> {
        self.connection
            .query_row(
                "SELECT message_id, message_bytes, reason, inserted \
                 FROM messages ORDER BY inserted DESC LIMIT 1",
                [],
                |row| {
                    let id_bytes: Vec<u8> = row.get(0)?;
                    let raw_data: Vec<u8> = row.get(1)?;
                    let reason: String = row.get(2)?;
                    let inserted: String = row.get(3)?;
                    Ok((id_bytes, raw_data, reason, inserted))
                },
            )
            .optional()?
            .map(|(id_bytes, raw_data, reason, inserted)| {
                let mut id = [0u8; 16];
                id.copy_from_slice(&id_bytes[..16]);
                let inserted = DateTime::parse_from_rfc3339(&inserted)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                Ok((
                    DlqEntry {
                        message_id: MessageId::from_bytes(id),
                        raw_data,
                        reason,
                    },
                    inserted,
                ))
            })
            .transpose()
    }
}

impl<M: Message> Dlq<M> for SqliteDlq {
    fn insert(&mut self, message: &M, reason: String) -> Result<(), SwitchyardError> {
        let now = Utc::now().to_rfc3339();
        self.connection
            .execute(
                "INSERT OR REPLACE INTO messages (message_id, message_bytes, reason, inserted) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![message.message_id().as_bytes().to_vec(), message.raw_data(), reason, now],
            )
            .map(|_| ())
            .map_err(|e| SwitchyardError::Dlq {
                message_id: message.message_id(),
                reason: e.to_string(),
            })
    }

    fn remove(&mut self, id: &MessageId) -> Option<DlqEntry> {
        let entry = self
            .connection
            .query_row(
                "SELECT message_bytes, reason FROM messages WHERE message_id = ?1",
                params![id.as_bytes().to_vec()],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .ok()
            .flatten()
            .map(|(raw_data, reason)| DlqEntry {
                message_id: *id,
                raw_data,
                reason,
            });
        if entry.is_some() {
            let _ = self.connection.execute(
                "DELETE FROM messages WHERE message_id = ?1",
                params![id.as_bytes().to_vec()],
            );
        }
        entry
    }

    fn len(&self) -> usize {
        self.connection
            .query_row("SELECT count(*) FROM messages", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    fn keys(&self) -> Vec<MessageId> {
        let mut statement = match self.connection.prepare("SELECT message_id FROM messages") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        let rows = statement.query_map([], |row| row.get::<_, Vec<u8>>(0));
        let Ok(rows) = rows else { return Vec::new() };
        rows.filter_map(Result::ok)
            .filter_map(|bytes| {
                let mut id = [0u8; 16];
                (bytes.len() == 16).then(|| {
                    id.copy_from_slice(&bytes);
                    MessageId::from_bytes(id)
                })
            })
            .collect()
    }

    /// Not supported: a borrowed `&DlqEntry` can't be produced from a row
    /// fetched on demand. Use [`Self::remove`] (owned) or [`Self::oldest`]
    /// to read an entry back.
    fn get(&self, _id: &MessageId) -> Option<&DlqEntry> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::message::RawMessage;

    #[test]
    fn insert_then_oldest_round_trips_bytes_and_reason() {
        let mut dlq = SqliteDlq::in_memory().unwrap();
        let message = RawMessage::new(b"payload".to_vec());
        Dlq::<RawMessage>::insert(&mut dlq, &message, "no matching handlers".into()).unwrap();
        let (entry, _inserted) = dlq.oldest().unwrap().unwrap();
        assert_eq!(entry.raw_data, b"payload");
        assert_eq!(entry.reason, "no matching handlers");
    }

    #[test]
    fn len_reflects_inserted_rows() {
        let mut dlq = SqliteDlq::in_memory().unwrap();
        assert_eq!(Dlq::<RawMessage>::len(&dlq), 0);
        let message = RawMessage::new(b"x".to_vec());
        Dlq::<RawMessage>::insert(&mut dlq, &message, "fault".into()).unwrap();
        assert_eq!(Dlq::<RawMessage>::len(&dlq), 1);
    }
}
