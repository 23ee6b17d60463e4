use crate::{errors::ErrorCode, RouteTable};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Handle ID type - safer than raw pointers
pub type HandleId = u64;

/// Route table as seen from C: values are opaque caller tokens (next-hop ids etc.).
pub type FfiTable = RouteTable<u64>;

/// Global handle registry for tables opened through the C ABI
struct HandleRegistry {
    handles: Mutex<HashMap<HandleId, Arc<FfiTable>>>,
    next_id: AtomicU64,
}

impl HandleRegistry {
    fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1), // Start from 1, reserve 0 for null/invalid
        }
    }

    fn register(&self, table: FfiTable) -> Result<HandleId, ErrorCode> {
        let handle_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut handles = self.handles.lock().map_err(|_| ErrorCode::Unknown)?;
        handles.insert(handle_id, Arc::new(table));
        Ok(handle_id)
    }

    /// Clone the table out so the registry lock is not held during table operations.
    fn get(&self, handle_id: HandleId) -> Result<Arc<FfiTable>, ErrorCode> {
        if handle_id == 0 {
            return Err(ErrorCode::InvalidHandle);
        }
        let handles = self.handles.lock().map_err(|_| ErrorCode::InvalidHandle)?;
        handles.get(&handle_id).cloned().ok_or(ErrorCode::InvalidHandle)
    }

    fn unregister(&self, handle_id: HandleId) -> Result<(), ErrorCode> {
        if handle_id == 0 {
            return Err(ErrorCode::InvalidHandle);
        }
        let mut handles = self.handles.lock().map_err(|_| ErrorCode::InvalidHandle)?;
        match handles.remove(&handle_id) {
            Some(_) => Ok(()),
            None => Err(ErrorCode::InvalidHandle),
        }
    }
}

static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();

fn get_registry() -> &'static HandleRegistry {
    REGISTRY.get_or_init(HandleRegistry::new)
}

/// Register a new table and return its handle ID
pub fn register_handle(table: FfiTable) -> Result<HandleId, ErrorCode> {
    get_registry().register(table)
}

/// Execute a function with the table identified by handle_id
pub fn with_handle<T, F>(handle_id: HandleId, f: F) -> Result<T, ErrorCode>
where
    F: FnOnce(&FfiTable) -> T,
{
    let table = get_registry().get(handle_id)?;
    Ok(f(&table))
}

/// Unregister a table. Calls already running on it finish on their own clone.
pub fn unregister_handle(handle_id: HandleId) -> Result<(), ErrorCode> {
    get_registry().unregister(handle_id)
}
