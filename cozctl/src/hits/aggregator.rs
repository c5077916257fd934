//! # Concurrent Hit Aggregation
//!
//! Counts how often instrumented lines execute and how irregularly, to find
//! good progress point candidates.
//!
//! ## Concurrency
//!
//! ```text
//! app thread ──┐
//! app thread ──┼──▶ clock.fetch_add (lock-free) ──▶ buckets[key].lock() ──▶ update
//! app thread ──┘
//! ```
//!
//! - One process-wide logical clock (`AtomicU64`), incremented once per hit.
//! - One `Mutex` per bucket; the map itself is sharded (`DashMap`) and only
//!   write-locks a shard when a new key is first seen.
//! - Unrelated keys never wait on each other's bucket lock.

use super::report::{Candidate, HitReport};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_SEQ: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_SEQ: u64 = NEXT_THREAD_SEQ.fetch_add(1, Ordering::Relaxed);
}

/// Process-unique number of the calling thread
fn current_thread_seq() -> u64 {
    THREAD_SEQ.with(|seq| *seq)
}

/// Whether buckets are split by calling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// One bucket per (thread, class, line); preserves per-thread cadence
    #[default]
    PerThread,
    /// One bucket per (class, line)
    Global,
}

/// Thread component of a bucket key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HitThread {
    Global,
    Thread(u64),
}

impl fmt::Display for HitThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitThread::Global => write!(f, "global"),
            HitThread::Thread(seq) => write!(f, "thread#{seq}"),
        }
    }
}

/// Finest granularity the aggregator tracks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitKey {
    pub thread: HitThread,
    pub class_name: Cow<'static, str>,
    pub line_number: i32,
}

/// Statistics for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitStatistics {
    pub hits: u64,
    /// Logical time of the most recent hit
    pub last_hit_time: u64,
    /// Largest logical-clock gap between two consecutive hits
    pub max_interval: u64,
}

impl HitStatistics {
    fn register_hit(&mut self, time: u64) {
        // The first hit has no predecessor. A hit whose clock value lost the
        // race for the bucket lock is counted but does not move the clock back.
        if self.hits > 0 && time > self.last_hit_time {
            self.max_interval = self.max_interval.max(time - self.last_hit_time);
        }
        self.hits += 1;
        self.last_hit_time = self.last_hit_time.max(time);
    }
}

/// Concurrent per-location hit counter.
#[derive(Debug, Default)]
pub struct HitAggregator {
    partitioning: Partitioning,
    clock: AtomicU64,
    buckets: DashMap<HitKey, Mutex<HitStatistics>>,
    thread_names: DashMap<u64, String>,
}

impl HitAggregator {
    #[must_use]
    pub fn new(partitioning: Partitioning) -> Self {
        Self { partitioning, ..Self::default() }
    }

    pub fn partitioning(&self) -> Partitioning {
        self.partitioning
    }

    /// Record one execution of `class_name:line_number`.
    ///
    /// Safe to call from any number of threads. Returns the logical time
    /// assigned to this hit.
    pub fn register_hit(&self, class_name: impl Into<Cow<'static, str>>, line_number: i32) -> u64 {
        let time = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let thread = match self.partitioning {
            Partitioning::PerThread => HitThread::Thread(current_thread_seq()),
            Partitioning::Global => HitThread::Global,
        };
        let key = HitKey { thread, class_name: class_name.into(), line_number };

        if let Some(bucket) = self.buckets.get(&key) {
            bucket.lock().register_hit(time);
            return time;
        }

        if let HitThread::Thread(seq) = thread {
            self.thread_names.entry(seq).or_insert_with(|| {
                let current = std::thread::current();
                current.name().map_or_else(|| format!("thread-{seq}"), |name| format!("{name} (#{seq})"))
            });
        }
        self.buckets.entry(key).or_default().lock().register_hit(time);
        time
    }

    /// Current value of the logical clock (total hits recorded)
    pub fn clock(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Statistics for one key, if it has been hit
    pub fn statistics(&self, key: &HitKey) -> Option<HitStatistics> {
        self.buckets.get(key).map(|bucket| *bucket.lock())
    }

    /// Number of distinct buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All buckets, ordered by thread, then class, then line.
    pub fn snapshot(&self) -> Vec<HitReport> {
        let mut entries: Vec<(HitKey, HitStatistics)> = self
            .buckets
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value().lock()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            (a.thread, &a.class_name, a.line_number).cmp(&(b.thread, &b.class_name, b.line_number))
        });

        entries
            .into_iter()
            .map(|(key, stats)| HitReport {
                thread: self.thread_label(key.thread),
                class_name: key.class_name.into_owned(),
                line_number: key.line_number,
                hits: stats.hits,
                max_interval: stats.max_interval,
            })
            .collect()
    }

    /// Rank lines as progress point candidates.
    ///
    /// Buckets are merged across threads. Lines hit at least twice are
    /// ordered by smallest `max_interval` (steadiest) then most hits.
    pub fn rank_candidates(&self, limit: usize) -> Vec<Candidate> {
        let mut merged: BTreeMap<(String, i32), (u64, u64)> = BTreeMap::new();
        for entry in &self.buckets {
            let stats = *entry.value().lock();
            let key = entry.key();
            let slot = merged.entry((key.class_name.to_string(), key.line_number)).or_default();
            slot.0 += stats.hits;
            slot.1 = slot.1.max(stats.max_interval);
        }

        let mut candidates: Vec<Candidate> = merged
            .into_iter()
            .filter(|(_, (hits, _))| *hits >= 2)
            .map(|((class_name, line_number), (hits, max_interval))| Candidate {
                class_name,
                line_number,
                hits,
                max_interval,
            })
            .collect();
        candidates.sort_by_key(|c| (c.max_interval, Reverse(c.hits)));
        candidates.truncate(limit);
        candidates
    }

    fn thread_label(&self, thread: HitThread) -> String {
        match thread {
            HitThread::Global => "all threads".to_string(),
            HitThread::Thread(seq) => self
                .thread_names
                .get(&seq)
                .map_or_else(|| format!("thread-{seq}"), |name| name.value().clone()),
        }
    }
}
