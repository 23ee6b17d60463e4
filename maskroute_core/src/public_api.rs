use crate::{
    errors::{map_error, set_last_error, ErrorCode},
    handle_registry::{register_handle, unregister_handle, with_handle, HandleId},
    helpers::parse_addr,
    RouteTable,
};
use log::warn;
use std::{ffi::CStr, os::raw::c_char};

// ─────────────────────────── helpers ─────────────────────────────────── //

#[inline]
fn cstr<'a>(p: *const c_char) -> Result<&'a str, ErrorCode> {
    if p.is_null() {
        return Err(ErrorCode::Utf8Error);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|_| ErrorCode::Utf8Error)
}

/// Record `code` as the thread's last error and hand it back.
#[inline]
fn finish(code: ErrorCode) -> ErrorCode {
    set_last_error(code);
    code
}

// ─── small helper to turn Result<T,ErrorCode> into early-return ──────────
macro_rules! try_c { ($expr:expr) => { match $expr {
    Ok(v)  => v,
    Err(e) => return finish(e),
}}}

fn invalid(what: &str, input: &str, e: &crate::Error) -> ErrorCode {
    warn!("[FFI] rejected {what} {input:?}: {e}");
    map_error(e)
}

// ───────────────────────── lifetime ──────────────────────────────────── //

/// Create an empty table.
/// Returns `Success` **and** stores the handle in `*out`
/// -- or an error code otherwise.
#[no_mangle]
pub extern "C" fn maskroute_open(out: *mut HandleId) -> ErrorCode {
    if out.is_null() {
        return finish(ErrorCode::InvalidInput);
    }
    let id = try_c!(register_handle(RouteTable::new()));
    unsafe { *out = id };
    finish(ErrorCode::Success)
}

#[no_mangle]
pub extern "C" fn maskroute_close(h: HandleId) -> ErrorCode {
    try_c!(unregister_handle(h));
    finish(ErrorCode::Success)
}

// ───────────────────────── CRUD ──────────────────────────────────────── //

#[no_mangle]
pub extern "C" fn maskroute_add(h: HandleId, cidr_utf8: *const c_char, value: u64) -> ErrorCode {
    let cidr = try_c!(cstr(cidr_utf8));
    let res = try_c!(with_handle(h, |t| t.add_route(cidr, value)));
    match res {
        Ok(()) => finish(ErrorCode::Success),
        Err(e) => finish(invalid("route", cidr, &e)),
    }
}

#[no_mangle]
pub extern "C" fn maskroute_del(h: HandleId, cidr_utf8: *const c_char) -> ErrorCode {
    let cidr = try_c!(cstr(cidr_utf8));
    let res = try_c!(with_handle(h, |t| t.del_route(cidr)));
    match res {
        Ok(()) => finish(ErrorCode::Success),
        Err(e) => finish(invalid("route", cidr, &e)),
    }
}

/// Longest-prefix match on a numeric address (`a.b.c.d` == `a << 24 | … | d`).
/// A miss returns `NotFound` and leaves `*out_value` untouched.
/// A null `out_value` is `InvalidInput`.
#[no_mangle]
pub extern "C" fn maskroute_lookup(h: HandleId, addr: u32, out_value: *mut u64) -> ErrorCode {
    if out_value.is_null() {
        return finish(ErrorCode::InvalidInput);
    }
    match try_c!(with_handle(h, |t| t.lookup(addr))) {
        Some(v) => {
            unsafe { *out_value = *v };
            finish(ErrorCode::Success)
        }
        None => finish(ErrorCode::NotFound),
    }
}

#[no_mangle]
pub extern "C" fn maskroute_lookup_str(
    h: HandleId,
    addr_utf8: *const c_char,
    out_value: *mut u64,
) -> ErrorCode {
    let addr_s = try_c!(cstr(addr_utf8));
    let addr = match parse_addr(addr_s) {
        Ok(a) => a,
        Err(e) => return finish(invalid("address", addr_s, &e)),
    };
    maskroute_lookup(h, addr, out_value)
}

// ───────────────────── size & maintenance ────────────────────────────── //

#[no_mangle]
pub extern "C" fn maskroute_len(h: HandleId, out: *mut u64) -> ErrorCode {
    if out.is_null() {
        return finish(ErrorCode::InvalidInput);
    }
    let n = try_c!(with_handle(h, |t| t.len()));
    unsafe { *out = n as u64 };
    finish(ErrorCode::Success)
}

#[no_mangle]
pub extern "C" fn maskroute_clear(h: HandleId) -> ErrorCode {
    try_c!(with_handle(h, |t| t.clear()));
    finish(ErrorCode::Success)
}
