use crate::types::{wall_clock, Key, Timestamp, Value};
use dashmap::DashMap;

/// A stored value together with the wall-clock stamp of its most recent write.
struct VersionedValue {
    value: Value,
    write_ts: Timestamp,
}

/// Versioned in-memory key/value store.
///
/// Internally synchronized: the locking schedulers write from the scheduler
/// thread only, but parallel OCC applies writes from concurrently running
/// validation tasks on the worker pool.
pub struct Storage {
    cells: DashMap<Key, VersionedValue>,
}

impl Storage {
    pub fn new() -> Storage {
        Storage {
            cells: DashMap::new(),
        }
    }

    /// Returns the current value under `key`, or `None` if it was never written.
    pub fn read(&self, key: Key) -> Option<Value> {
        self.cells.get(&key).map(|cell| cell.value)
    }

    /// Stores `value` under `key` and stamps the write with the current wall clock.
    pub fn write(&self, key: Key, value: Value) {
        self.cells.insert(
            key,
            VersionedValue {
                value,
                write_ts: wall_clock(),
            },
        );
    }

    /// Wall-clock stamp of the most recent write to `key`, or 0 if never written.
    pub fn timestamp(&self, key: Key) -> Timestamp {
        self.cells.get(&key).map(|cell| cell.write_ts).unwrap_or(0)
    }
}

impl Default for Storage {
    fn default() -> Storage {
        Storage::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Storage;

    #[test]
    fn missing_keys_read_as_absent() {
        let storage = Storage::new();
        assert_eq!(storage.read(1), None);
        assert_eq!(storage.timestamp(1), 0);
    }

    #[test]
    fn writes_advance_the_timestamp() {
        let storage = Storage::new();
        storage.write(1, 10);
        let first = storage.timestamp(1);
        assert!(first > 0);
        assert_eq!(storage.read(1), Some(10));

        storage.write(1, 20);
        assert_eq!(storage.read(1), Some(20));
        assert!(storage.timestamp(1) >= first);
    }
}
