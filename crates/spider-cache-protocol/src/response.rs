//! Parsers for memcached ASCII replies
//!
//! The connection layer hands these functions the reply lines with their
//! `\r\n` stripped and the terminating `END` removed.

use crate::error::{ProtocolError, Result};
use crate::types::SlabId;
use tracing::trace;

/// Largest item memcached can be configured to store (`-I 1024m`)
pub const MAX_VALUE_BYTES: usize = 1024 * 1024 * 1024;

/// Keys recovered from one `stats cachedump` reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDump {
    /// Keys in dump order
    pub keys: Vec<String>,
    /// Lines that were not well-formed `ITEM` records
    pub skipped: usize,
}

/// Map a reply line to an error if it is one of the generic error replies.
#[must_use]
pub fn error_reply(line: &str) -> Option<ProtocolError> {
    if line == "ERROR" || line.starts_with("CLIENT_ERROR") || line.starts_with("SERVER_ERROR") {
        Some(ProtocolError::Server(line.to_string()))
    } else {
        None
    }
}

/// Extract slab class ids from a `stats slabs` reply.
///
/// Per-slab lines look like `STAT 3:chunk_size 152`. Aggregate lines such as
/// `STAT active_slabs 2` carry no slab id and are ignored. Ids are returned in
/// first-seen order without duplicates.
///
/// # Example
///
/// ```
/// use spider_cache_protocol::response::parse_slab_ids;
/// use spider_cache_protocol::SlabId;
///
/// let lines = vec![
///     "STAT 1:chunk_size 96".to_string(),
///     "STAT 1:used_chunks 4".to_string(),
///     "STAT 5:chunk_size 240".to_string(),
///     "STAT active_slabs 2".to_string(),
/// ];
/// assert_eq!(parse_slab_ids(&lines), vec![SlabId(1), SlabId(5)]);
/// ```
#[must_use]
pub fn parse_slab_ids(lines: &[String]) -> Vec<SlabId> {
    let mut ids: Vec<SlabId> = Vec::new();

    for line in lines {
        let Some(stat) = line.strip_prefix("STAT ") else {
            trace!("Ignoring non-STAT line in slabs reply: {line:?}");
            continue;
        };
        let name = stat.split_whitespace().next().unwrap_or_default();
        let Some((id, _field)) = name.split_once(':') else {
            continue;
        };
        match id.parse::<u32>() {
            Ok(id) if id > 0 => {
                let id = SlabId(id);
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            _ => trace!("Ignoring slab stat with unusable id: {name:?}"),
        }
    }

    ids
}

/// Extract keys from a `stats cachedump` reply.
///
/// Each record has the shape `ITEM <key> [<bytes> b; <exptime> s]`. Anything
/// else is counted in [`CacheDump::skipped`] and otherwise ignored.
///
/// # Example
///
/// ```
/// use spider_cache_protocol::response::parse_cachedump;
///
/// let lines = vec![
///     "ITEM options:siteurl [19 b; 0 s]".to_string(),
///     "garbage".to_string(),
///     "ITEM 1:posts:42 [512 b; 1700000000 s]".to_string(),
/// ];
/// let dump = parse_cachedump(&lines);
/// assert_eq!(dump.keys, vec!["options:siteurl", "1:posts:42"]);
/// assert_eq!(dump.skipped, 1);
/// ```
#[must_use]
pub fn parse_cachedump(lines: &[String]) -> CacheDump {
    let mut dump = CacheDump::default();

    for line in lines {
        if let Some(key) = parse_item_line(line) {
            dump.keys.push(key.to_string());
        } else {
            trace!("Skipping malformed cachedump record: {line:?}");
            dump.skipped += 1;
        }
    }

    dump
}

fn parse_item_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("ITEM ")?;
    let (key, meta) = rest.split_once(' ')?;
    let meta = meta.trim();
    if key.is_empty() || !meta.starts_with('[') || !meta.ends_with(']') {
        return None;
    }
    Some(key)
}

/// Interpret the single-line reply to `delete`.
///
/// # Errors
///
/// Returns [`ProtocolError::Server`] for error replies and
/// [`ProtocolError::Parse`] for anything unrecognised.
pub fn parse_delete_reply(line: &str) -> Result<bool> {
    match line {
        "DELETED" => Ok(true),
        "NOT_FOUND" => Ok(false),
        other => Err(error_reply(other)
            .unwrap_or_else(|| ProtocolError::Parse(format!("unexpected delete reply: {other}")))),
    }
}

/// Parse a `VALUE <key> <flags> <bytes> [<cas>]` header line.
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] when the header is incomplete, its
/// numeric fields do not parse, or the length exceeds [`MAX_VALUE_BYTES`].
pub fn parse_value_header(line: &str) -> Result<(String, u32, usize)> {
    let bad = || ProtocolError::Parse(format!("malformed VALUE header: {line}"));

    let mut parts = line.split_whitespace();
    if parts.next() != Some("VALUE") {
        return Err(bad());
    }
    let key = parts.next().ok_or_else(bad)?;
    let flags = parts
        .next()
        .and_then(|f| f.parse::<u32>().ok())
        .ok_or_else(bad)?;
    let bytes = parts
        .next()
        .and_then(|b| b.parse::<usize>().ok())
        .ok_or_else(bad)?;
    if bytes > MAX_VALUE_BYTES {
        return Err(ProtocolError::Parse(format!(
            "VALUE of {bytes} bytes exceeds the {MAX_VALUE_BYTES} byte item limit"
        )));
    }

    Ok((key.to_string(), flags, bytes))
}
