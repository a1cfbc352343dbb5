use std::collections::BTreeMap;
use std::sync::Mutex;

/// Reserved key holding the concatenation of all other entries' frames.
/// It is exclusively derived output — never set directly.
pub const AGGREGATE_KEY: &str = "latest_events";

struct Inner {
    /// Latest wire frame per event key, in sorted key order so the
    /// aggregate enumerates deterministically.
    entries: BTreeMap<String, String>,
    /// Cached concatenation of every entry's frame, recomputed on upsert.
    aggregate: String,
}

/// Latest-value-per-key store backing new-connection replay.
///
/// `upsert` and the recomputation of the aggregate snapshot happen under one
/// lock, so a snapshot always reflects a complete set of upserts — concurrent
/// writers race only on per-key last-write-wins, never on losing a write.
pub struct HistoryStore {
    inner: Mutex<Inner>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty())
    }

    /// Rebuild the store from persisted (key, frame) rows, e.g. at startup.
    pub fn from_entries(rows: impl IntoIterator<Item = (String, String)>) -> Self {
        let entries: BTreeMap<String, String> = rows
            .into_iter()
            .filter(|(key, _)| key != AGGREGATE_KEY)
            .collect();
        let aggregate = concat_frames(&entries);
        Self {
            inner: Mutex::new(Inner { entries, aggregate }),
        }
    }

    /// Store the latest frame for a key and recompute the aggregate snapshot
    /// as one atomic unit.
    pub fn upsert(&self, key: &str, frame: &str) {
        if key == AGGREGATE_KEY {
            tracing::warn!("Refusing to upsert reserved history key {}", AGGREGATE_KEY);
            return;
        }

        let mut inner = self.inner.lock().expect("history lock poisoned");
        inner.entries.insert(key.to_string(), frame.to_string());
        let aggregate = concat_frames(&inner.entries);
        inner.aggregate = aggregate;
    }

    /// Latest frame for a single key.
    pub fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().expect("history lock poisoned");
        if key == AGGREGATE_KEY {
            return Some(inner.aggregate.clone());
        }
        inner.entries.get(key).cloned()
    }

    /// The full replay snapshot: every entry's frame, concatenated in key
    /// order, excluding the aggregate key itself.
    pub fn snapshot(&self) -> String {
        self.inner
            .lock()
            .expect("history lock poisoned")
            .aggregate
            .clone()
    }

    /// Number of distinct keys tracked (excluding the aggregate).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("history lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn concat_frames(entries: &BTreeMap<String, String>) -> String {
    let mut aggregate = String::with_capacity(entries.values().map(String::len).sum());
    for frame in entries.values() {
        aggregate.push_str(frame);
    }
    aggregate
}
