use crate::Digest;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Process-wide set of digests currently being worked on.
#[derive(Default)]
pub(crate) struct DigestLocks {
    held: Mutex<HashSet<Digest>>,
    released: Condvar,
}

impl DigestLocks {
    pub(crate) fn acquire(&self, digest: Digest) -> DigestGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&digest) {
            held = self.released.wait(held).unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(digest);
        DigestGuard { locks: self, digest }
    }
}

/// Exclusive claim on one digest; released on drop.
#[must_use = "the digest is released as soon as the guard is dropped"]
pub struct DigestGuard<'a> {
    locks: &'a DigestLocks,
    digest: Digest,
}

impl Drop for DigestGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.digest);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_same_digest_is_exclusive() {
        let locks = DigestLocks::default();
        let digest = Digest::of_bytes(b"jar");
        let inside = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let _guard = locks.acquire(digest);
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    std::thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
    }

    #[test]
    fn test_different_digests_do_not_block() {
        let locks = DigestLocks::default();
        let _a = locks.acquire(Digest::of_bytes(b"a"));
        let _b = locks.acquire(Digest::of_bytes(b"b"));
    }
}
