//! Session Commands
//!
//! Line-oriented commands accepted by the `pilot_cache` binary.
//!
//! # Commands
//! - `set <key> <json>` - Queue a write
//! - `get <key>` - Read the persisted value
//! - `del <key>` - Remove a key directly from the store
//! - `flush` - Drain the write queue now
//! - `len` - Number of queued writes
//! - `stats` - Queue, store and memo diagnostics
//! - `quit` - Flush and exit

use serde::Serialize;
use serde_json::Value;

use crate::cache::{Document, MemoStats};
use crate::context::CacheContext;
use crate::error::{CacheError, Result};
use crate::storage::KeyValueStore;

// == Command ==
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { key: String, value: Value },
    Get { key: String },
    Del { key: String },
    Flush,
    Len,
    Stats,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "set" => {
                let (key, raw) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| CacheError::InvalidCommand("usage: set <key> <json>".into()))?;
                let value = serde_json::from_str(raw.trim()).map_err(|e| {
                    CacheError::InvalidCommand(format!("value for {} is not JSON: {}", key, e))
                })?;
                Command::Set {
                    key: key.to_string(),
                    value,
                }
            }
            "get" => Command::Get {
                key: single_key(verb, rest)?,
            },
            "del" => Command::Del {
                key: single_key(verb, rest)?,
            },
            "flush" => Command::Flush,
            "len" => Command::Len,
            "stats" => Command::Stats,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(CacheError::InvalidCommand(format!(
                    "unknown command: {}",
                    other
                )))
            }
        };

        Ok(Some(command))
    }
}

fn single_key(verb: &str, rest: &str) -> Result<String> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(CacheError::InvalidCommand(format!("usage: {} <key>", verb)));
    }
    Ok(rest.to_string())
}

// == Session Stats ==
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub queued_writes: usize,
    pub flush_pending: bool,
    pub stored_keys: usize,
    pub cached_elements: usize,
    pub memo: MemoStats,
}

// == Execute ==
/// Runs `command` against `ctx` and renders the reply line.
pub fn execute<D: Document>(ctx: &CacheContext<D>, command: &Command) -> Result<String> {
    let reply = match command {
        Command::Set { key, value } => {
            ctx.queue_storage_write(key, value)?;
            format!("queued {} ({} pending)", key, ctx.storage_queue_len())
        }
        Command::Get { key } => ctx
            .store()
            .get(key)?
            .unwrap_or_else(|| "(nil)".to_string()),
        Command::Del { key } => {
            ctx.store().remove(key)?;
            format!("deleted {}", key)
        }
        Command::Flush | Command::Quit => {
            let report = ctx.force_flush_storage_queue();
            serde_json::to_string(&report)?
        }
        Command::Len => ctx.storage_queue_len().to_string(),
        Command::Stats => serde_json::to_string(&SessionStats {
            queued_writes: ctx.storage_queue_len(),
            flush_pending: ctx.has_pending_flush(),
            stored_keys: ctx.store().len(),
            cached_elements: ctx.dom_cache_len(),
            memo: ctx.memo_cache_stats(),
        })?,
    };
    Ok(reply)
}
