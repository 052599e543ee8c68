//! Priority frontier shared by the crawl workers
//!
//! This module handles:
//! - Priority ordering of pending items (priority, then depth, then enqueue order)
//! - Permanent URL deduplication through a seen-set
//! - Blocking hand-off to idle workers, with close semantics
//! - Per-domain politeness before an item is released

use crate::crawler::item::CrawlItem;
use crate::crawler::politeness::{wait_turn, DomainPolicy, PolitenessRegistry};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::ops::Deref;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// A crawl item as stored in the heap
///
/// `seq` is assigned under the frontier lock and breaks ties between items
/// whose enqueue instants compare equal.
#[derive(Debug)]
struct QueuedItem {
    item: CrawlItem,
    seq: u64,
}

// BinaryHeap is a max-heap, so every comparison is reversed: the smallest
// (priority, depth, enqueued_at, seq) tuple pops first.
impl Ord for QueuedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .item
            .priority()
            .cmp(&self.item.priority())
            .then_with(|| other.item.depth().cmp(&self.item.depth()))
            .then_with(|| other.item.enqueued_at().cmp(&self.item.enqueued_at()))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedItem {}

/// Everything guarded by the frontier lock
#[derive(Debug)]
struct FrontierState {
    queue: BinaryHeap<QueuedItem>,
    seen: HashSet<String>,
    policies: PolitenessRegistry,
    closed: bool,
    next_seq: u64,
    /// Items handed out whose [`ClaimedItem`] is still alive
    in_flight: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<FrontierState>,
    available: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe priority frontier
///
/// `add` never blocks; `next` blocks until an item is available or the
/// frontier is closed, drained and idle. Share it between workers behind an
/// `Arc`.
#[derive(Debug)]
pub struct Frontier {
    shared: Arc<Shared>,
}

impl Frontier {
    /// Creates an empty frontier whose domains default to `delay` between requests
    pub fn new(delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FrontierState {
                    queue: BinaryHeap::new(),
                    seen: HashSet::new(),
                    policies: PolitenessRegistry::new(delay),
                    closed: false,
                    next_seq: 0,
                    in_flight: 0,
                }),
                available: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.shared.lock()
    }

    /// Adds an item unless its URL has been seen before
    ///
    /// Returns `true` if the item was queued. Duplicates are routine and are
    /// dropped silently. Items added after [`Frontier::close`] are still
    /// queued and drained.
    pub fn add(&self, item: CrawlItem) -> bool {
        {
            let mut state = self.lock();
            if !state.seen.insert(item.as_str().to_string()) {
                tracing::trace!("Skipping already seen URL {}", item.as_str());
                return false;
            }

            state.policies.policy_for(item.domain());
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(QueuedItem { item, seq });
        }

        self.shared.available.notify_one();
        true
    }

    /// Takes the next item, waiting for work and for the item's domain
    ///
    /// Returns `None` once the frontier is closed, empty, and no handed-out
    /// item is still being processed; that is the only way this returns
    /// without an item. While a [`ClaimedItem`] is alive its holder may still
    /// add follow-up items, so idle callers keep waiting for them.
    pub async fn next(&self) -> Option<ClaimedItem> {
        let claimed = loop {
            let mut notified = pin!(self.shared.available.notified());
            // Register before checking so a close, add or release between
            // the check and the await still wakes us.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(queued) = state.queue.pop() {
                    let policy = state.policies.policy_for(queued.item.domain());
                    state.in_flight += 1;
                    break ClaimedItem {
                        item: queued.item,
                        policy,
                        shared: Arc::clone(&self.shared),
                    };
                }
                if state.closed && state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        };

        // Only the domain lock is held from here on; dropping the claim on
        // cancellation still releases the in-flight slot.
        wait_turn(&claimed.policy).await;
        Some(claimed)
    }

    /// Closes the frontier and wakes every waiting worker
    ///
    /// Idempotent. Items still queued or added by in-flight holders are
    /// handed out before `next` starts returning `None`.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        tracing::debug!("Frontier closed");
        self.shared.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be handed out
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of handed-out items not yet released
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of distinct URLs ever accepted
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.lock().seen.contains(url)
    }

    /// Number of domains with a politeness policy
    pub fn domain_count(&self) -> usize {
        self.lock().policies.len()
    }
}

/// An item taken from the [`Frontier`]
///
/// The item counts as in flight until this is dropped. It also carries the
/// politeness policy of the item's domain, so any further request the holder
/// makes to that domain can wait its turn too.
#[derive(Debug)]
pub struct ClaimedItem {
    item: CrawlItem,
    policy: Arc<tokio::sync::Mutex<DomainPolicy>>,
    shared: Arc<Shared>,
}

impl ClaimedItem {
    pub fn item(&self) -> &CrawlItem {
        &self.item
    }

    /// Politeness policy shared by every request to this item's domain
    pub fn politeness(&self) -> &tokio::sync::Mutex<DomainPolicy> {
        &self.policy
    }
}

impl Deref for ClaimedItem {
    type Target = CrawlItem;

    fn deref(&self) -> &CrawlItem {
        &self.item
    }
}

impl Drop for ClaimedItem {
    fn drop(&mut self) {
        let idle = {
            let mut state = self.shared.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0
        };
        // The last release may be what lets closed-frontier waiters finish
        if idle {
            self.shared.available.notify_waiters();
        }
    }
}
