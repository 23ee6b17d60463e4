//! Minimal run‑time metrics sink.
//!
//! Prometheus export is left out; instead the host process may register a
//! raw callback that receives name/value pairs.

use crate::constants::{
    METRIC_LOOKUP_HITS, METRIC_LOOKUP_MISSES, METRIC_ROUTES, METRIC_ROUTES_ADDED,
    METRIC_ROUTES_DELETED,
};
use metrics::{
    counter, gauge, Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString,
    Unit,
};
use once_cell::sync::{Lazy, OnceCell};
use std::ffi::CString;
use std::os::raw::{c_char, c_ulonglong};
use std::sync::Arc;

/// Signature for external collectors.
pub type StatsCallback = unsafe extern "C" fn(name: *const c_char, value: c_ulonglong);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Register a callback from C/other languages. Only the first registration wins.
///
/// # Safety
/// `cb` must stay callable for the rest of the process and must not unwind.
#[no_mangle]
pub unsafe extern "C" fn maskroute_register_stats_callback(cb: StatsCallback) {
    let _ = CALLBACK.set(cb);
}

/// Forwarding recorder. Uses the callback **if** it was registered.
struct FfiRecorder;

/// One registered metric; keeps a NUL-terminated copy of its name for C.
struct FfiMetric {
    name: Option<CString>,
}

impl FfiMetric {
    fn new(key: &Key) -> Arc<Self> {
        Arc::new(Self {
            name: CString::new(key.name()).ok(),
        })
    }

    fn emit(&self, value: u64) {
        if let (Some(cb), Some(name)) = (CALLBACK.get(), self.name.as_ref()) {
            unsafe { cb(name.as_ptr(), value as c_ulonglong) };
        }
    }
}

impl Recorder for FfiRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(FfiMetric::new(key))
    }
    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(FfiMetric::new(key))
    }
    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(FfiMetric::new(key))
    }
}

impl metrics::CounterFn for FfiMetric {
    fn increment(&self, value: u64) {
        self.emit(value);
    }
    fn absolute(&self, value: u64) {
        self.emit(value);
    }
}

// Gauges and histograms are reported truncated to whole numbers.
impl metrics::GaugeFn for FfiMetric {
    fn set(&self, value: f64) {
        self.emit(value as u64);
    }
    fn increment(&self, value: f64) {
        self.emit(value as u64);
    }
    fn decrement(&self, value: f64) {
        self.emit(value as u64);
    }
}

impl metrics::HistogramFn for FfiMetric {
    fn record(&self, value: f64) {
        self.emit(value as u64);
    }
}

/// Install exactly **once** – called when the first table is built.
/// A recorder installed earlier by the host process is left in place.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        if metrics::set_global_recorder(FfiRecorder).is_err() {
            log::debug!("[TELEMETRY] Global recorder already installed; keeping it.");
        }
    });
}

/// Handles the table reports through, resolved once so hot paths never
/// re-register (and re-allocate) a metric.
pub(crate) struct TableMetrics {
    pub routes: Gauge,
    pub routes_added: Counter,
    pub routes_deleted: Counter,
    pub lookup_hits: Counter,
    pub lookup_misses: Counter,
}

// A host recorder must be installed before the first table is built to receive these.
static HANDLES: Lazy<TableMetrics> = Lazy::new(|| {
    init();
    TableMetrics {
        routes: gauge!(METRIC_ROUTES),
        routes_added: counter!(METRIC_ROUTES_ADDED),
        routes_deleted: counter!(METRIC_ROUTES_DELETED),
        lookup_hits: counter!(METRIC_LOOKUP_HITS),
        lookup_misses: counter!(METRIC_LOOKUP_MISSES),
    }
});

#[inline]
pub(crate) fn handles() -> &'static TableMetrics {
    &HANDLES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteTable;
    use std::ffi::CStr;
    use std::sync::atomic::{AtomicU64, Ordering};

    static ADDED: AtomicU64 = AtomicU64::new(0);

    unsafe extern "C" fn collect(name: *const c_char, value: c_ulonglong) {
        let name = unsafe { CStr::from_ptr(name) };
        if name.to_bytes() == b"maskroute_routes_added" {
            ADDED.fetch_add(value, Ordering::SeqCst);
        }
    }

    #[test]
    fn callback_receives_counters() {
        unsafe { maskroute_register_stats_callback(collect) };
        let t: RouteTable<u8> = RouteTable::new();
        t.add_route("10.0.0.0/8", 1u8).unwrap();
        t.add_route("10.0.0.0/16", 2u8).unwrap();
        assert!(ADDED.load(Ordering::SeqCst) >= 2);
    }
}
