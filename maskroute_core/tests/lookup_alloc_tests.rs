use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use maskroute_core::RouteTable;

/// Counts allocations made by threads that opted in.
struct CountingAlloc;

static ALLOCS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNTING.try_with(Cell::get).unwrap_or(false) {
            ALLOCS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[test]
fn lookups_do_not_allocate() {
    let t: RouteTable<u64> = RouteTable::new();
    t.add_route("10.0.0.0/8", 1u64).unwrap();
    let hit = u32::from_be_bytes([10, 1, 2, 3]);
    let miss = u32::from_be_bytes([192, 0, 2, 1]);

    // warm up metric handles and the lock
    for _ in 0..10 {
        assert!(t.lookup(hit).is_some());
        assert!(t.lookup(miss).is_none());
    }

    COUNTING.with(|c| c.set(true));
    for _ in 0..1_000 {
        assert!(t.lookup(hit).is_some());
        assert!(t.lookup(miss).is_none());
        assert!(t.lookup_match(hit).is_some());
    }
    COUNTING.with(|c| c.set(false));

    assert_eq!(ALLOCS.load(Ordering::Relaxed), 0, "lookup allocated");
}
