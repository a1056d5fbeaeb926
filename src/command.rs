//! Line protocol driving the `read` workload.
//!
//! ```text
//! set <hex-key>
//! getBothRange <hex-key>, <hex-value>
//! ```
//!
//! Anything else is skipped so captured traces can be replayed as-is.

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Position the cursor on `key`.
    Set { key: Vec<u8> },
    /// Position the cursor on `key` at the first duplicate `>= value`.
    GetBothRange { key: Vec<u8>, value: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Command(Command),
    Skip,
}

pub fn parse_line(line: &str) -> ParsedLine {
    let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(' ').collect();
    match parts[0] {
        "set" => {
            let Some(key) = parts.get(1) else {
                return ParsedLine::Skip;
            };
            match decode_key(key) {
                Some(key) => ParsedLine::Command(Command::Set { key }),
                None => ParsedLine::Skip,
            }
        }
        "getBothRange" => {
            if parts.len() <= 2 {
                return ParsedLine::Skip;
            }
            let key = parts[1].strip_suffix(',').unwrap_or(parts[1]);
            match (decode_key(key), decode(parts[2])) {
                (Some(key), Some(value)) => {
                    ParsedLine::Command(Command::GetBothRange { key, value })
                }
                _ => ParsedLine::Skip,
            }
        }
        _ => ParsedLine::Skip,
    }
}

/// Engines reject zero-length keys, so those lines are skipped too.
fn decode_key(token: &str) -> Option<Vec<u8>> {
    let key = decode(token)?;
    if key.is_empty() {
        warn!(token, "skipping line with an empty key");
        return None;
    }
    Some(key)
}

fn decode(token: &str) -> Option<Vec<u8>> {
    let token = token.strip_prefix("0x").unwrap_or(token);
    match hex::decode(token) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(token, error = %e, "skipping line with malformed hex");
            None
        }
    }
}
