//! Append-only file-backed dead-letter queue.
//!
//! Every insert appends `<raw_data>,<reason>\n` to the backing file and
//! flushes immediately. There is no delete, no read path, and no way to
//! recover `len`/`keys`/`get` once the process restarts — this backend
//! trades queryability for the simplest possible write path, matching a
//! tail-and-grep workflow rather than a reprocessing one.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use switchyard_core::dlq::{Dlq, DlqEntry};
use switchyard_core::message::{Message, MessageId};
use switchyard_core::SwitchyardError;

pub struct FileDlq {
    path: PathBuf,
    file: Mutex<File>,
    inserted: Mutex<Vec<MessageId>>,
}

impl FileDlq {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            inserted: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<M: Message> Dlq<M> for FileDlq {
    fn insert(&mut self, message: &M, reason: String) -> Result<(), SwitchyardError> {
        let mut line = message.raw_data().to_vec();
        line.push(b',');
        line.extend_from_slice(reason.as_bytes());
        line.push(b'\n');

        let mut file = self.file.lock().expect("poisoned");
        file.write_all(&line).map_err(|e| SwitchyardError::Dlq {
            message_id: message.message_id(),
            reason: e.to_string(),
        })?;
        file.flush().map_err(|e| SwitchyardError::Dlq {
            message_id: message.message_id(),
            reason: e.to_string(),
        })?;
        drop(file);

        self.inserted.lock().expect("poisoned").push(message.message_id());
        Ok(())
    }

    /// Not meaningfully supported: this backend never reads entries back.
    fn remove(&mut self, _id: &MessageId) -> Option<DlqEntry> {
        None
    }

    fn len(&self) -> usize {
        self.inserted.lock().expect("poisoned").len()
    }

    fn keys(&self) -> Vec<MessageId> {
        self.inserted.lock().expect("poisoned").clone()
    }

    /// Not supported: entries are never read back from the file.
    fn get(&self, _id: &MessageId) -> Option<&DlqEntry> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::message::RawMessage;

    #[test]
    fn insert_appends_a_csv_line() {
        let dir = std::env::temp_dir().join(format!("switchyard-dlq-file-test-{:?}", std::thread::current().id()));
        let mut dlq = FileDlq::open(&dir).unwrap();
        let message = RawMessage::new(b"payload".to_vec());
        Dlq::<RawMessage>::insert(&mut dlq, &message, "boom".into()).unwrap();
        let contents = std::fs::read_to_string(&dir).unwrap();
        assert_eq!(contents, "payload,boom\n");
        std::fs::remove_file(&dir).ok();
    }
}
