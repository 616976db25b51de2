use crate::models::event::{Event, EventType};
use crate::models::user::{User, UserStatus};
use crate::utils::time::{from_millis, to_millis};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// WAL operation types
///
/// Users are logged as full rows on every write, so the last `PutUser` for an
/// id wins on replay. Events are logged once.
#[derive(Debug, Clone, PartialEq)]
pub enum WalOperation {
    PutUser(User),
    AppendEvent(Event),
}

impl WalOperation {
    fn to_line(&self) -> String {
        match self {
            WalOperation::PutUser(user) => {
                let checked_in = user
                    .last_checked_in
                    .map(|t| to_millis(t).to_string())
                    .unwrap_or_else(|| "-".to_string());
                // Names are free text, hex keeps them clear of the separator
                format!(
                    "PUT_USER|{}|{}|{}|{}|{}|{}|{}",
                    user.id,
                    user.card_key,
                    hex::encode(user.first_name.as_bytes()),
                    hex::encode(user.last_name.as_bytes()),
                    user.status.code(),
                    if user.active { "1" } else { "0" },
                    checked_in
                )
            }
            WalOperation::AppendEvent(event) => format!(
                "EVENT|{}|{}|{}|{}",
                event.id,
                event.user_id,
                to_millis(event.created_at),
                event.event_type.code()
            ),
        }
    }

    fn from_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').collect();

        match parts.first() {
            Some(&"PUT_USER") => {
                if parts.len() != 8 {
                    bail!("Invalid PUT_USER format");
                }
                let id = parts[1].parse::<i64>().context("Invalid user ID")?;
                let card_key = parts[2].parse::<i64>().context("Invalid card key")?;
                let first_name = decode_text(parts[3]).context("Invalid first name")?;
                let last_name = decode_text(parts[4]).context("Invalid last name")?;
                let status_code = parts[5].parse::<u8>().context("Invalid status")?;
                let status = UserStatus::try_from(status_code).map_err(|e| anyhow!(e))?;
                let active = match parts[6] {
                    "1" => true,
                    "0" => false,
                    other => bail!("Invalid active flag '{}'", other),
                };
                let last_checked_in = match parts[7] {
                    "-" => None,
                    millis => {
                        let millis = millis.parse::<i64>().context("Invalid check-in time")?;
                        Some(from_millis(millis).context("Check-in time out of range")?)
                    }
                };

                Ok(WalOperation::PutUser(User {
                    id,
                    card_key,
                    first_name,
                    last_name,
                    status,
                    active,
                    last_checked_in,
                }))
            }
            Some(&"EVENT") => {
                if parts.len() != 5 {
                    bail!("Invalid EVENT format");
                }
                let id = parts[1].parse::<i64>().context("Invalid event ID")?;
                let user_id = parts[2].parse::<i64>().context("Invalid user ID")?;
                let millis = parts[3].parse::<i64>().context("Invalid event time")?;
                let created_at = from_millis(millis).context("Event time out of range")?;
                let code = parts[4].parse::<u8>().context("Invalid event type")?;
                let event_type = EventType::try_from(code).map_err(|e| anyhow!(e))?;

                Ok(WalOperation::AppendEvent(Event::new(
                    id, user_id, event_type, created_at,
                )))
            }
            _ => bail!("Unknown operation type"),
        }
    }
}

fn decode_text(encoded: &str) -> Result<String> {
    let bytes = hex::decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

pub struct Wal {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open WAL file")?;

        Ok(Wal {
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_operation(&self, op: &WalOperation) -> Result<()> {
        let line = op.to_line();
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("WAL file lock poisoned"))?;
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        Ok(())
    }

    pub fn replay(&self) -> Result<Vec<WalOperation>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut operations = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            match WalOperation::from_line(line) {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(operations)
    }
}
