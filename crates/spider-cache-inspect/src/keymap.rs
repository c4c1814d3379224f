//! Keymap reconstruction from raw cache keys.
//!
//! The owning application stores entries under colon-delimited keys of the
//! shape `[salt:][site:]group:key`. Decoding reverses that convention:
//!
//! 1. empty keys and keys without a `:` are protocol noise and are skipped;
//! 2. the key is split on `:`;
//! 3. with a salt offset the first segment is dropped, and fewer than two
//!    remaining segments means the key is skipped;
//! 4. a first segment made only of digits is a site id and the group follows
//!    it, otherwise the key is global and the first segment is the group;
//! 5. keys for a site other than the filtered one are dropped;
//! 6. the rest of the segments, re-joined with `:`, form the short key. A
//!    site key with nothing after its group (`5:posts`) has an empty short key.
//!
//! # Known limitation
//!
//! A global group whose name is all digits cannot be told apart from a site
//! id. Such keys are always decoded as site scoped.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::trace;

/// Site a key belongs to. `Global` sorts before every site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SiteScope {
    /// Shared by all sites
    Global,
    /// Scoped to one site
    Site(u64),
}

impl SiteScope {
    /// Scope for a numeric site id; `0` means global.
    #[must_use]
    pub const fn from_id(id: u64) -> Self {
        if id == 0 { Self::Global } else { Self::Site(id) }
    }

    /// Numeric id, `0` for global
    #[must_use]
    pub const fn id(self) -> u64 {
        match self {
            Self::Global => 0,
            Self::Site(id) => id,
        }
    }

    /// Whether the scope is global
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for SiteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Site(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for SiteScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id())
    }
}

/// Which site-scoped keys survive decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteFilter {
    /// Keep keys of every site
    #[default]
    AllSites,
    /// Keep global keys and keys of this site only
    Site(u64),
}

impl SiteFilter {
    /// Whether a key with `scope` is kept
    #[must_use]
    pub const fn admits(self, scope: SiteScope) -> bool {
        match (self, scope) {
            (_, SiteScope::Global) | (Self::AllSites, _) => true,
            (Self::Site(current), SiteScope::Site(id)) => current == id,
        }
    }
}

/// Whether raw keys carry a leading salt segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaltOffset {
    /// Keys start directly with the logical segments
    #[default]
    Unsalted,
    /// Keys start with one opaque salt segment
    Salted,
}

impl SaltOffset {
    /// Number of leading segments to drop
    #[must_use]
    pub const fn segments(self) -> usize {
        match self {
            Self::Unsalted => 0,
            Self::Salted => 1,
        }
    }
}

impl From<bool> for SaltOffset {
    fn from(salted: bool) -> Self {
        if salted { Self::Salted } else { Self::Unsalted }
    }
}

/// One raw key broken into its logical parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedKeyRef {
    /// Site the key belongs to
    pub site_scope: SiteScope,
    /// Application cache group
    pub group: String,
    /// Key within the group
    pub short_key: String,
    /// Key as stored on the server
    pub raw: String,
}

/// Why a raw key produced no [`DecodedKeyRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The key was empty
    Empty,
    /// The key had no `:` separator
    NoSeparator,
    /// Not enough segments were left after removing the salt
    MissingSegments,
}

/// Parser for the `[salt:][site:]group:key` convention
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyParser {
    salt: SaltOffset,
}

impl KeyParser {
    /// Parser honouring `salt`
    #[must_use]
    pub const fn new(salt: SaltOffset) -> Self {
        Self { salt }
    }

    /// Decode a single raw key.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the key is not a logical cache key.
    ///
    /// # Example
    ///
    /// ```
    /// use spider_cache_inspect::keymap::{KeyParser, SaltOffset, SiteScope};
    ///
    /// let parser = KeyParser::new(SaltOffset::Salted);
    /// let decoded = parser.parse("SALT:5:posts:123").unwrap();
    /// assert_eq!(decoded.site_scope, SiteScope::Site(5));
    /// assert_eq!(decoded.group, "posts");
    /// assert_eq!(decoded.short_key, "123");
    /// ```
    pub fn parse(&self, raw: &str) -> Result<DecodedKeyRef, SkipReason> {
        if raw.is_empty() {
            return Err(SkipReason::Empty);
        }
        if !raw.contains(':') {
            return Err(SkipReason::NoSeparator);
        }

        let segments: Vec<&str> = raw.split(':').skip(self.salt.segments()).collect();
        if segments.len() < 2 {
            return Err(SkipReason::MissingSegments);
        }

        let (site_scope, group, short_key) = match site_id(segments[0]) {
            Some(id) => (SiteScope::from_id(id), segments[1], segments[2..].join(":")),
            None => (SiteScope::Global, segments[0], segments[1..].join(":")),
        };

        Ok(DecodedKeyRef {
            site_scope,
            group: group.to_string(),
            short_key,
            raw: raw.to_string(),
        })
    }
}

fn site_id(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// All keys discovered for one (site, group) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    /// Site the group belongs to
    pub site_scope: SiteScope,
    /// Group name
    pub group: String,
    /// Short keys in discovery order
    pub keys: Vec<String>,
    /// First raw key seen for the group
    pub representative_raw: String,
}

/// Decoded view of a server's keys, grouped by (site, group)
///
/// Iteration is ordered by site id (global first), then group name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keymap {
    entries: BTreeMap<(SiteScope, String), GroupEntry>,
}

impl Keymap {
    /// Look up one group
    #[must_use]
    pub fn get(&self, site_scope: SiteScope, group: &str) -> Option<&GroupEntry> {
        self.entries.get(&(site_scope, group.to_string()))
    }

    /// Entries in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &GroupEntry> {
        self.entries.values()
    }

    /// Number of groups
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no group was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys across all groups
    #[must_use]
    pub fn total_keys(&self) -> usize {
        self.entries.values().map(|e| e.keys.len()).sum()
    }

    fn insert(&mut self, decoded: DecodedKeyRef) {
        let DecodedKeyRef {
            site_scope,
            group,
            short_key,
            raw,
        } = decoded;

        self.entries
            .entry((site_scope, group.clone()))
            .and_modify(|entry| entry.keys.push(short_key.clone()))
            .or_insert_with(|| GroupEntry {
                site_scope,
                group,
                keys: vec![short_key],
                representative_raw: raw,
            });
    }
}

impl<'a> IntoIterator for &'a Keymap {
    type Item = &'a GroupEntry;
    type IntoIter = std::collections::btree_map::Values<'a, (SiteScope, String), GroupEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl Serialize for Keymap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

/// Build a [`Keymap`] from raw keys.
///
/// Raw keys repeated in the input (for example across slabs) are counted
/// once. The function has no hidden state: identical inputs give identical
/// keymaps.
///
/// # Example
///
/// ```
/// use spider_cache_inspect::keymap::{SaltOffset, SiteFilter, SiteScope, decode};
///
/// let keymap = decode(
///     ["options:siteurl", "7:posts:456", "3:posts:1"],
///     SaltOffset::Unsalted,
///     SiteFilter::Site(3),
/// );
///
/// assert_eq!(keymap.len(), 2);
/// assert!(keymap.get(SiteScope::Global, "options").is_some());
/// assert!(keymap.get(SiteScope::Site(7), "posts").is_none());
/// ```
pub fn decode<I, S>(raw_keys: I, salt: SaltOffset, filter: SiteFilter) -> Keymap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parser = KeyParser::new(salt);
    let mut seen = HashSet::new();
    let mut keymap = Keymap::default();

    for raw in raw_keys {
        let raw = raw.as_ref();

        let decoded = match parser.parse(raw) {
            Ok(decoded) => decoded,
            Err(reason) => {
                trace!("Skipping raw key {raw:?}: {reason:?}");
                continue;
            }
        };

        if !filter.admits(decoded.site_scope) {
            trace!("Skipping raw key {raw:?}: outside {filter:?}");
            continue;
        }

        if !seen.insert(raw.to_string()) {
            continue;
        }

        keymap.insert(decoded);
    }

    keymap
}
