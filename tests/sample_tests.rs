//! Integration tests for concurrent sampling.
//!
//! Probes are pushed and popped on some threads while others sample the same
//! category. Every sample must be either empty or a value that is still live.

use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use varprobe::platform::SpinCriticalSection;
use varprobe::{Config, Identifier, Probe, Registry, Traceable};

static CLOCK: AtomicU64 = AtomicU64::new(0);

struct SharedConfig;

impl Config for SharedConfig {
    type CriticalSection = SpinCriticalSection;
    type Timestamp = u64;

    const MAX_VARIABLE_SIZE: usize = 64;
    const MAX_COEXISTENT_PROBES: usize = 4;

    // Strictly increasing while the section is held.
    fn now() -> u64 {
        CLOCK.fetch_add(1, Ordering::Relaxed)
    }
}

// =============================================================================
// Concurrent Push/Pop/Sample Tests
// =============================================================================

#[test]
fn test_samples_are_never_torn() {
    static REGISTRY: Registry<SharedConfig> = Registry::new();
    let category = REGISTRY.register(Identifier::encode("pattern"), <[u64; 4]>::DESCRIPTOR);

    let patterns: Vec<[u64; 4]> = (1..=4u64).map(|i| [i * 0x0101_0101_0101_0101; 4]).collect();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..2_000 {
                Probe::scope(category, &patterns[0], || {
                    Probe::scope(category, &patterns[1], || {
                        Probe::scope(category, &patterns[2], || {
                            Probe::scope(category, &patterns[3], || {})
                        })
                    })
                });
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..2 {
            s.spawn(|| {
                let mut last = None;
                while !done.load(Ordering::Acquire) {
                    let sample = category.sample();
                    if let Some(prev) = last {
                        assert!(sample.timestamp > prev);
                    }
                    last = Some(sample.timestamp);

                    if sample.is_empty() {
                        continue;
                    }
                    assert_eq!(sample.bytes.len(), 32);
                    let first = sample.bytes[0];
                    assert!((1..=4).contains(&first), "unexpected byte {first}");
                    assert!(sample.bytes.iter().all(|b| *b == first), "torn sample");
                }
            });
        }
    });

    assert_eq!(category.depth(), 0);
    assert!(category.sample().is_empty());
}

#[test]
fn test_independent_categories() {
    static REGISTRY: Registry<SharedConfig> = Registry::new();
    let left = REGISTRY.register(Identifier::encode("left"), u32::DESCRIPTOR);
    let right = REGISTRY.register(Identifier::encode("right"), u32::DESCRIPTOR);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..500u32 {
                let value = i;
                Probe::scope(left, &value, || {
                    assert_eq!(left.sample().bytes, i.to_ne_bytes());
                });
            }
        });
        s.spawn(|| {
            for i in 0..500u32 {
                let value = !i;
                Probe::scope(right, &value, || {
                    assert_eq!(right.sample().bytes, (!i).to_ne_bytes());
                });
            }
        });
    });

    assert_eq!(REGISTRY.count(), 2);
    assert!(!left.is_live());
    assert!(!right.is_live());
}

// =============================================================================
// Cross-Thread Release Tests
// =============================================================================

#[test]
fn test_older_thread_releases_first() {
    static REGISTRY: Registry<SharedConfig> = Registry::new();
    let category = REGISTRY.register(Identifier::encode("crossing"), u64::DESCRIPTOR);
    let pushed = Barrier::new(2);
    let freed = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            let older = Box::new(0xAAAA_AAAA_AAAA_AAAAu64);
            Probe::scope(category, &*older, || {
                pushed.wait();
                // Wait until the other thread's variable is the newest.
                pushed.wait();
            });
            drop(older);
            freed.wait();
        });
        s.spawn(|| {
            let newer = 0xBBBB_BBBB_BBBB_BBBBu64;
            pushed.wait();
            Probe::scope(category, &newer, || {
                pushed.wait();
                freed.wait();
                assert_eq!(category.depth(), 1);
                assert_eq!(category.sample().bytes, newer.to_ne_bytes());
            });
        });
    });

    assert_eq!(category.depth(), 0);
    assert!(category.sample().is_empty());
}

#[test]
fn test_newer_thread_releases_first() {
    static REGISTRY: Registry<SharedConfig> = Registry::new();
    let category = REGISTRY.register(Identifier::encode("unwinding"), u32::DESCRIPTOR);
    let pushed = Barrier::new(2);
    let freed = Barrier::new(2);

    thread::scope(|s| {
        s.spawn(|| {
            let older = 0x1111_1111u32;
            Probe::scope(category, &older, || {
                pushed.wait();
                pushed.wait();
                freed.wait();
                assert_eq!(category.sample().bytes, older.to_ne_bytes());
            });
        });
        s.spawn(|| {
            pushed.wait();
            let newer = Box::new(0x2222_2222u32);
            Probe::scope(category, &*newer, || {
                pushed.wait();
            });
            drop(newer);
            freed.wait();
        });
    });

    assert!(category.sample().is_empty());
}
