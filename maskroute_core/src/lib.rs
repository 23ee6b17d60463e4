pub mod constants;
pub mod errors;
pub mod handle_registry;
pub mod helpers;
pub mod public_api;
pub mod telemetry;
pub mod types;

pub use crate::errors::Error;
pub use crate::types::{Match, RouteTable};

use constants::*;
use helpers::*;
use log::{debug, info};
#[cfg(feature = "trace")]
use log::trace;
use once_cell::sync::OnceCell;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::sync::Arc;
use types::Section;

impl<V> RouteTable<V> {
    // ---- logging bootstraper -------------------------------------------------
    fn ensure_logging() {
        static INIT: OnceCell<()> = OnceCell::new();
        INIT.get_or_init(|| {
            let _ = env_logger::builder()
                .format_timestamp(None)
                .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
                .try_init();
        });
    }

    /// Build an empty table: every slot allocated with its mask, every bitmask zero.
    pub fn new() -> Self {
        Self::ensure_logging();
        telemetry::init();
        let table = Self {
            sections: std::array::from_fn(Section::new),
        };
        info!(
            "[NEW] Route table ready: {} slots in {} sections of {}.",
            SLOT_COUNT, SECTION_COUNT, SECTION_SIZE
        );
        table
    }

    #[inline]
    fn section_for(&self, prefix_len: u8) -> (&Section<V>, usize) {
        let (sec, bit) = section_of(slot_index(prefix_len));
        (&self.sections[sec], bit)
    }

    /// Register `network` (CIDR) with `value`, overwriting any value already
    /// stored for the exact same prefix.
    pub fn add_route(&self, network: &str, value: impl Into<Arc<V>>) -> Result<(), Error> {
        let (key, plen) = parse_cidr(network)?;
        let (section, bit) = self.section_for(plen);
        let prev = section.write().insert(bit, key, value.into());
        // `prev` drops here, after the section lock is released.
        debug!(
            "[ADD] {}/{} stored{}.",
            Ipv4Addr::from(key),
            plen,
            if prev.is_some() { " (overwrite)" } else { "" }
        );
        telemetry::handles().routes_added.increment(1);
        Ok(())
    }

    /// Add every `(cidr, value)` pair, stopping at the first invalid CIDR.
    /// Routes added before the failure stay in the table.
    pub fn add_routes<I, S, T>(&self, routes: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: Into<Arc<V>>,
    {
        for (network, value) in routes {
            self.add_route(network.as_ref(), value)?;
        }
        Ok(())
    }

    /// Remove the exact prefix `network`. Absent prefixes are a no-op.
    pub fn del_route(&self, network: &str) -> Result<(), Error> {
        let (key, plen) = parse_cidr(network)?;
        let (section, bit) = self.section_for(plen);
        let prev = section.write().remove(bit, key);
        match prev {
            Some(_) => {
                debug!("[DELETE] {}/{} removed.", Ipv4Addr::from(key), plen);
                telemetry::handles().routes_deleted.increment(1);
            }
            None => debug!("[DELETE] {}/{} not present. No-op.", Ipv4Addr::from(key), plen),
        }
        Ok(())
    }

    /// Is the exact prefix `network` registered?
    pub fn contains_route(&self, network: &str) -> Result<bool, Error> {
        let (key, plen) = parse_cidr(network)?;
        let (section, bit) = self.section_for(plen);
        let state = section.read();
        Ok(state.slots[bit].entries.contains_key(&key))
    }

    /// Longest-prefix match for a raw IPv4 address, as `u32::from(Ipv4Addr)`.
    pub fn lookup(&self, addr: u32) -> Option<Arc<V>> {
        self.find(addr).map(|(_, value)| value)
    }

    pub fn lookup_ip(&self, addr: Ipv4Addr) -> Option<Arc<V>> {
        self.lookup(u32::from(addr))
    }

    /// Longest-prefix match returning the winning network as well as its value.
    pub fn lookup_match(&self, addr: u32) -> Option<Match<V>> {
        self.find(addr).map(|(plen, value)| Match {
            network: to_net(canonical(addr, plen), plen),
            value,
        })
    }

    /// Prefix length and value of the longest match.
    ///
    /// Each section stays read-locked for its whole scan, so a lookup never
    /// sees a bitmask that disagrees with the slot maps.
    fn find(&self, addr: u32) -> Option<(u8, Arc<V>)> {
        for section in &self.sections {
            let state = section.read();
            if state.occupancy == 0 {
                continue;
            }
            if let Some((slot, value)) = state.probe(addr) {
                #[cfg(feature = "trace")]
                trace!(
                    "[LOOKUP] {} matched /{} (occupancy={:#010b})",
                    Ipv4Addr::from(addr),
                    slot.prefix_len,
                    state.occupancy
                );
                telemetry::handles().lookup_hits.increment(1);
                return Some((slot.prefix_len, Arc::clone(value)));
            }
        }
        #[cfg(feature = "trace")]
        trace!("[LOOKUP] {} no match", Ipv4Addr::from(addr));
        telemetry::handles().lookup_misses.increment(1);
        None
    }

    /// Number of registered prefixes across all lengths.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.read().occupancy == 0)
    }

    /// Snapshot of every route, longest prefix first, then by network address.
    /// Sections are copied one at a time, not as one atomic view.
    pub fn routes(&self) -> Vec<(Ipv4Net, Arc<V>)> {
        let mut out = Vec::new();
        for section in &self.sections {
            let state = section.read();
            for slot in &state.slots {
                let mut entries: Vec<_> = slot
                    .entries
                    .iter()
                    .map(|(&k, v)| (to_net(k, slot.prefix_len), Arc::clone(v)))
                    .collect();
                entries.sort_unstable_by_key(|(net, _)| net.addr());
                out.extend(entries);
            }
        }
        out
    }

    /// Drops every route, section by section.
    pub fn clear(&self) {
        info!("[CLEAR] Clearing route table.");
        let mut removed = 0usize;
        for section in &self.sections {
            let released = section.write().drain();
            removed += released.len();
        }
        telemetry::handles().routes_deleted.increment(removed as u64);
        info!("[CLEAR] {} routes removed.", removed);
    }

    /// Emit gauges (caller decides cadence).
    pub fn report_metrics(&self) {
        telemetry::handles().routes.set(self.len() as f64);
    }

    /// Checks, section by section, that every occupancy bit agrees with its
    /// slot map and that every stored key is a canonical network address.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> bool {
        self.sections.iter().all(|s| s.read().is_consistent())
    }
}

impl<V> Default for RouteTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
