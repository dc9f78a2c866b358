//! Bounded, time-expiring host name cache.
//!
//! A fixed table of slots; inserting a known host refreshes its slot, an
//! unknown host evicts the least recently inserted one.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::constants::{DNS_CACHE_TTL_SECS, DNS_MAX_ENTRIES, DNS_MAX_HOST_LEN};

/// Time source, injectable for tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct DnsEntry {
    host: String,
    address: String,
    inserted_at: Instant,
}

pub struct DnsCache<C: Clock = SystemClock> {
    slots: Vec<Option<DnsEntry>>,
    ttl: Duration,
    max_host_len: usize,
    clock: C,
}

impl DnsCache<SystemClock> {
    pub fn new(capacity: usize, ttl: Duration, max_host_len: usize) -> Self {
        Self::with_clock(capacity, ttl, max_host_len, SystemClock)
    }
}

impl Default for DnsCache<SystemClock> {
    fn default() -> Self {
        Self::new(
            DNS_MAX_ENTRIES,
            Duration::from_secs(DNS_CACHE_TTL_SECS),
            DNS_MAX_HOST_LEN,
        )
    }
}

impl<C: Clock> DnsCache<C> {
    pub fn with_clock(capacity: usize, ttl: Duration, max_host_len: usize, clock: C) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            ttl,
            max_host_len,
            clock,
        }
    }

    /// Cached address for `host`, or `None` when absent or expired.
    pub fn lookup(&self, host: &str) -> Option<&str> {
        let now = self.clock.now();
        let hit = self.slots.iter().flatten().find(|entry| {
            now.saturating_duration_since(entry.inserted_at) < self.ttl
                && entry.host.eq_ignore_ascii_case(host)
        });
        match hit {
            Some(entry) => {
                debug!(host, address = %entry.address, "dns cache hit");
                Some(entry.address.as_str())
            }
            None => {
                debug!(host, "dns cache miss");
                None
            }
        }
    }

    /// Remember `address` for `host`. Over-long names are ignored.
    pub fn insert(&mut self, host: &str, address: &str) {
        if host.len() > self.max_host_len {
            debug!(host, "host name too long for dns cache, not caching");
            return;
        }
        let slot = self.slot_for(host);
        self.slots[slot] = Some(DnsEntry {
            host: host.to_string(),
            address: address.to_string(),
            inserted_at: self.clock.now(),
        });
    }

    /// Slot already holding `host`, else a free slot, else the oldest one.
    fn slot_for(&self, host: &str) -> usize {
        let known = self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|entry| entry.host.eq_ignore_ascii_case(host))
        });
        if let Some(idx) = known {
            return idx;
        }
        if let Some(idx) = self.slots.iter().position(Option::is_none) {
            return idx;
        }
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.as_ref().map(|entry| entry.inserted_at))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }
}
