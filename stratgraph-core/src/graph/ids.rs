use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Block identifier, unique within a graph and immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique suffix: millisecond timestamp + monotonic counter + random.
///
/// The counter alone guarantees uniqueness within a process; the timestamp and
/// random part keep ids from two sessions merged into one graph apart.
fn unique_suffix() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt: u32 = rand::thread_rng().gen();
    format!("{millis:x}-{seq:x}-{salt:08x}")
}

/// Generate a fresh block id.
pub fn generate_block_id() -> BlockId {
    BlockId(format!("blk-{}", unique_suffix()))
}

/// Generate a fresh note id.
pub fn generate_note_id() -> NoteId {
    NoteId(format!("note-{}", unique_suffix()))
}
