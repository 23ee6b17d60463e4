//! Constants and configuration for the route table

pub const MAX_PREFIX_LEN: u8 = 32;

/// One slot per prefix length, /32 down to /0.
pub const SLOT_COUNT: usize = MAX_PREFIX_LEN as usize + 1;

/// Slots per section. Each section tracks occupancy in a `u8`.
pub const SECTION_SIZE: usize = 8;
pub const SECTION_COUNT: usize = SLOT_COUNT.div_ceil(SECTION_SIZE);

// Telemetry names
pub const METRIC_ROUTES: &str = "maskroute_routes";
pub const METRIC_ROUTES_ADDED: &str = "maskroute_routes_added";
pub const METRIC_ROUTES_DELETED: &str = "maskroute_routes_deleted";
pub const METRIC_LOOKUP_HITS: &str = "maskroute_lookup_hits";
pub const METRIC_LOOKUP_MISSES: &str = "maskroute_lookup_misses";

const _: () = assert!(SECTION_SIZE <= u8::BITS as usize);
const _: () = assert!(SECTION_COUNT * SECTION_SIZE >= SLOT_COUNT);
