//! Per-domain politeness tracking
//!
//! Each domain gets its own [`DomainPolicy`] behind its own async lock, so a
//! worker waiting out one domain's delay never holds up another domain.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fraction of the delay used as the symmetric jitter bound
const JITTER_FRACTION: f64 = 0.1;

/// Spacing state for a single domain
#[derive(Debug)]
pub struct DomainPolicy {
    delay: Duration,
    last_request_time: Option<Instant>,
}

impl DomainPolicy {
    /// Creates a policy that has never been used
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_time: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn last_request_time(&self) -> Option<Instant> {
        self.last_request_time
    }

    /// How long a request made at `now` still has to wait
    ///
    /// `jitter` is a factor in `[-1, 1]` scaled to ±10% of the delay. The
    /// first request to a domain never waits.
    pub fn wait_duration(&self, now: Instant, jitter: f64) -> Duration {
        let Some(last) = self.last_request_time else {
            return Duration::ZERO;
        };

        let delay = self.delay.as_nanos() as i128;
        let elapsed = now.saturating_duration_since(last).as_nanos() as i128;
        let offset = (delay as f64 * JITTER_FRACTION * jitter.clamp(-1.0, 1.0)) as i128;
        let wait = delay - elapsed + offset;

        if wait > 0 {
            Duration::from_nanos(wait as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Records a request; the timestamp never moves backwards
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(match self.last_request_time {
            Some(last) if last > now => last,
            _ => now,
        });
    }
}

/// Lazily populated map of domain to policy
///
/// The map itself is owned by the frontier and mutated under its lock; the
/// policies are handed out as independent `Arc`s.
#[derive(Debug)]
pub struct PolitenessRegistry {
    default_delay: Duration,
    policies: HashMap<String, Arc<Mutex<DomainPolicy>>>,
}

impl PolitenessRegistry {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            policies: HashMap::new(),
        }
    }

    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Returns the policy for `domain`, creating it with the default delay
    pub fn policy_for(&mut self, domain: &str) -> Arc<Mutex<DomainPolicy>> {
        if let Some(policy) = self.policies.get(domain) {
            return Arc::clone(policy);
        }

        let policy = Arc::new(Mutex::new(DomainPolicy::new(self.default_delay)));
        self.policies.insert(domain.to_string(), Arc::clone(&policy));
        policy
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.policies.contains_key(domain)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Waits until `policy`'s domain may be requested again, then claims the slot
///
/// The domain lock is held for the whole wait, which serializes requests to
/// one domain while leaving every other domain free.
pub async fn wait_turn(policy: &Mutex<DomainPolicy>) {
    let mut policy = policy.lock().await;

    let jitter = rand::rng().random_range(-1.0..1.0);
    let wait = policy.wait_duration(Instant::now(), jitter);
    if !wait.is_zero() {
        tracing::trace!("Politeness wait of {:?}", wait);
        tokio::time::sleep(wait).await;
    }

    policy.record_request(Instant::now());
}
