use super::{ExclusiveLockManager, LockManager, LockState, SharedLockManager};
use crate::types::TxnId;
use crossbeam_channel::{unbounded, Receiver};

fn exclusive() -> (ExclusiveLockManager, Receiver<TxnId>) {
    let (ready_tx, ready_rx) = unbounded();
    (ExclusiveLockManager::new(ready_tx), ready_rx)
}

fn shared() -> (SharedLockManager, Receiver<TxnId>) {
    let (ready_tx, ready_rx) = unbounded();
    (SharedLockManager::new(ready_tx), ready_rx)
}

#[test]
fn exclusive_grants_only_the_first_requester() {
    let (mut lm, ready) = exclusive();
    assert!(lm.write_lock(1, 7));
    // Reads are exclusive in this variant.
    assert!(!lm.read_lock(2, 7));
    assert!(!lm.write_lock(3, 7));
    assert_eq!(lm.status(7), LockState::Exclusive(1));
    assert!(ready.try_recv().is_err());
}

#[test]
fn exclusive_wakes_in_fifo_order() {
    let (mut lm, ready) = exclusive();
    assert!(lm.write_lock(1, 7));
    assert!(!lm.write_lock(2, 7));
    assert!(!lm.write_lock(3, 7));

    lm.release(1, 7);
    assert_eq!(ready.try_recv(), Ok(2));
    assert!(ready.try_recv().is_err());
    assert_eq!(lm.status(7), LockState::Exclusive(2));

    lm.release(2, 7);
    assert_eq!(ready.try_recv(), Ok(3));

    lm.release(3, 7);
    assert_eq!(lm.status(7), LockState::Unlocked);
}

#[test]
fn ready_only_after_every_lock_granted() {
    let (mut lm, ready) = exclusive();
    assert!(lm.write_lock(1, 1));
    assert!(lm.write_lock(1, 2));
    assert!(!lm.write_lock(2, 1));
    assert!(!lm.write_lock(2, 2));

    lm.release(1, 1);
    // txn 2 still waits on key 2.
    assert!(ready.try_recv().is_err());

    lm.release(1, 2);
    assert_eq!(ready.try_recv(), Ok(2));
    assert!(ready.try_recv().is_err());
}

#[test]
fn releasing_an_unknown_request_is_a_noop() {
    let (mut lm, ready) = exclusive();
    assert!(lm.write_lock(1, 3));
    lm.release(2, 3); // txn never requested the key
    lm.release(1, 99); // key never locked
    lm.release(1, 3);
    lm.release(1, 3); // duplicate release
    assert_eq!(lm.status(3), LockState::Unlocked);
    assert!(ready.try_recv().is_err());
}

#[test]
fn sharers_are_compatible() {
    let (mut lm, ready) = shared();
    assert!(lm.read_lock(1, 4));
    assert!(lm.read_lock(2, 4));
    assert!(lm.read_lock(3, 4));
    assert_eq!(lm.status(4), LockState::Shared(vec![1, 2, 3]));

    // A writer queues behind the sharers, and later readers queue behind it.
    assert!(!lm.write_lock(4, 4));
    assert!(!lm.read_lock(5, 4));
    assert!(ready.try_recv().is_err());
}

#[test]
fn shared_queue_wakes_in_fifo_batches() {
    let (mut lm, ready) = shared();
    assert!(lm.write_lock(1, 5));
    assert!(!lm.read_lock(2, 5));
    assert!(!lm.read_lock(3, 5));
    assert!(!lm.write_lock(4, 5));
    assert!(!lm.read_lock(5, 5));
    assert_eq!(lm.status(5), LockState::Exclusive(1));

    // Dropping the writer grants the contiguous run of sharers behind it.
    lm.release(1, 5);
    assert_eq!(ready.try_recv(), Ok(2));
    assert_eq!(ready.try_recv(), Ok(3));
    assert!(ready.try_recv().is_err());
    assert_eq!(lm.status(5), LockState::Shared(vec![2, 3]));

    // The queued writer waits for every sharer ahead of it.
    lm.release(2, 5);
    assert!(ready.try_recv().is_err());
    lm.release(3, 5);
    assert_eq!(ready.try_recv(), Ok(4));
    assert_eq!(lm.status(5), LockState::Exclusive(4));

    lm.release(4, 5);
    assert_eq!(ready.try_recv(), Ok(5));
    assert_eq!(lm.status(5), LockState::Shared(vec![5]));
}

#[test]
fn releasing_a_blocked_request_can_unblock_later_sharers() {
    let (mut lm, ready) = shared();
    assert!(lm.read_lock(1, 9));
    assert!(!lm.write_lock(2, 9));
    assert!(!lm.read_lock(3, 9));

    // Dropping the queued writer lets the later reader share with the holder.
    lm.release(2, 9);
    assert_eq!(ready.try_recv(), Ok(3));
    assert!(ready.try_recv().is_err());
    assert_eq!(lm.status(9), LockState::Shared(vec![1, 3]));
}

#[test]
fn shared_ready_only_after_every_lock_granted() {
    let (mut lm, ready) = shared();
    assert!(lm.write_lock(1, 1));
    assert!(lm.read_lock(1, 2));
    assert!(!lm.read_lock(2, 1));
    assert!(!lm.write_lock(2, 2));

    lm.release(1, 1);
    assert!(ready.try_recv().is_err());

    lm.release(1, 2);
    assert_eq!(ready.try_recv(), Ok(2));
    assert!(ready.try_recv().is_err());
}
