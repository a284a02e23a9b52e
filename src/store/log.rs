//! Append-only newline-delimited event log with a resumable tail cursor.

use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log io: {0}")]
    Io(#[from] std::io::Error),
    #[error("log encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("event must be a json object")]
    NotAnObject,
}

/// Durable source of truth for swap events: one JSON object per line.
///
/// The append path and the tail cursor are guarded independently so local
/// event producers never contend with the reconciliation pass; appends are
/// whole-line atomic and flushed before returning.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    cursor: Mutex<u64>,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        EventLog {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(None),
            cursor: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, creating the log on first use, and flush before
    /// returning.
    pub fn append(&self, event: &Value) -> Result<(), LogError> {
        if !event.is_object() {
            return Err(LogError::NotAnObject);
        }
        let line = serde_json::to_string(event)?;
        let mut guard = self.writer.lock().unwrap();
        let mut writer = match guard.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                BufWriter::new(file)
            }
        };
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        *guard = Some(writer);
        Ok(())
    }

    /// Return every line appended since the previous call.
    ///
    /// The cursor advances past every returned line, including ones that
    /// later fail to parse. A log that shrank below the cursor (externally
    /// truncated) yields an empty batch and leaves the cursor untouched.
    pub fn tail_new(&self) -> Result<Vec<String>, LogError> {
        let mut cursor = self.cursor.lock().unwrap();
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let len = file.metadata()?.len();
        if *cursor > 0 && len <= *cursor {
            return Ok(Vec::new());
        }
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(*cursor))?;
        let mut lines = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            let n = reader.read_line(&mut buf)?;
            if n == 0 {
                break;
            }
            *cursor += n as u64;
            lines.push(buf.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(lines)
    }
}
