use crate::transaction::{Transaction, TxnContext, TxnLogic};
use crate::types::{Key, Value};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Transaction that touches nothing and commits immediately.
struct Noop;

impl TxnLogic for Noop {
    fn run(&self, ctx: &mut TxnContext<'_>) {
        ctx.commit();
    }
}

pub fn noop() -> Transaction {
    Transaction::new(BTreeSet::new(), BTreeSet::new(), Noop)
}

/// Unconditionally writes a fixed set of values.
struct Put {
    values: BTreeMap<Key, Value>,
}

impl TxnLogic for Put {
    fn run(&self, ctx: &mut TxnContext<'_>) {
        for (key, value) in &self.values {
            ctx.write(*key, *value);
        }
        ctx.commit();
    }
}

pub fn put(values: BTreeMap<Key, Value>) -> Transaction {
    let writeset = values.keys().copied().collect();
    Transaction::new(BTreeSet::new(), writeset, Put { values })
}

/// Commits iff every listed key currently holds the expected value; a missing
/// key or a mismatch aborts.
struct Expect {
    values: BTreeMap<Key, Value>,
}

impl TxnLogic for Expect {
    fn run(&self, ctx: &mut TxnContext<'_>) {
        for (key, want) in &self.values {
            if ctx.read(*key) != Some(*want) {
                ctx.abort();
                return;
            }
        }
        ctx.commit();
    }
}

pub fn expect(values: BTreeMap<Key, Value>) -> Transaction {
    let readset = values.keys().copied().collect();
    Transaction::new(readset, BTreeSet::new(), Expect { values })
}

/// Read-modify-write load transaction: increments every key in its write set
/// and optionally simulates work before committing.
struct Rmw {
    increments: BTreeSet<Key>,
    work: Duration,
}

impl TxnLogic for Rmw {
    fn run(&self, ctx: &mut TxnContext<'_>) {
        for key in &self.increments {
            let value = ctx.read(*key).unwrap_or(0);
            ctx.write(*key, value + 1);
        }
        ctx.sleep(self.work);
        ctx.commit();
    }
}

/// Builds an RMW transaction over `reads` keys read and `writes` keys
/// incremented, drawn without replacement from `0..db_size` so the two sets
/// are disjoint.
pub fn rmw(db_size: u64, reads: usize, writes: usize, work: Duration) -> Transaction {
    assert!(
        (reads + writes) as u64 <= db_size,
        "key sets exceed database size"
    );
    let mut rng = rand::thread_rng();
    let mut keys = BTreeSet::new();
    while keys.len() < reads + writes {
        keys.insert(rng.gen_range(0..db_size));
    }
    let readset: BTreeSet<Key> = keys.iter().copied().take(reads).collect();
    let writeset: BTreeSet<Key> = keys.iter().copied().skip(reads).collect();
    Transaction::new(
        readset,
        writeset.clone(),
        Rmw {
            increments: writeset,
            work,
        },
    )
}
