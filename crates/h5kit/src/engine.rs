// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global critical section around calls into the underlying engine.
//!
//! Collaborators report whether they tolerate concurrent reentrant calls.
//! When they do not, every call into them goes through one process-wide
//! reentrant lock so that nested calls made from the same thread (for
//! example a type lookup issued while committing) do not deadlock.

use parking_lot::{const_reentrant_mutex, ReentrantMutex};

static ENGINE_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

/// Run `f`, serialized through the engine lock unless `thread_safe`.
pub fn serialized<T>(thread_safe: bool, f: impl FnOnce() -> T) -> T {
    if thread_safe {
        return f();
    }
    let _guard = ENGINE_LOCK.lock();
    log::trace!("[engine] lock acquired");
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_nested_calls_do_not_deadlock() {
        let value = serialized(false, || serialized(false, || 41) + 1);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_serialized_calls_never_overlap() {
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                thread::spawn(move || {
                    for _ in 0..200 {
                        serialized(false, || {
                            if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            std::hint::spin_loop();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker panicked");
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
