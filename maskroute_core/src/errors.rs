//! Error handling and C-ABI error codes for maskroute

use std::cell::RefCell;
use std::os::raw::c_char;

/// Error type for RouteTable operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The string is not a well-formed IPv4 CIDR (or address, at the C boundary).
    #[error("invalid input: {0:?}")]
    InvalidInput(String),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput = 1,
    InvalidHandle = 2,
    Utf8Error = 3,
    NotFound = 4,
    Unknown = 255,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::InvalidInput => "Invalid input",
            ErrorCode::InvalidHandle => "Invalid handle",
            ErrorCode::Utf8Error => "UTF-8 conversion error",
            ErrorCode::NotFound => "Not found",
            ErrorCode::Unknown => "Unknown error",
        }
    }

    fn as_c_str(self) -> &'static [u8] {
        match self {
            ErrorCode::Success => b"Success\0",
            ErrorCode::InvalidInput => b"Invalid input\0",
            ErrorCode::InvalidHandle => b"Invalid handle\0",
            ErrorCode::Utf8Error => b"UTF-8 conversion error\0",
            ErrorCode::NotFound => b"Not found\0",
            ErrorCode::Unknown => b"Unknown error\0",
        }
    }
}

// Thread-local last error for C-ABI
thread_local! {
    static LAST_ERROR: RefCell<ErrorCode> = const { RefCell::new(ErrorCode::Success) };
}

pub fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = code);
}

pub fn get_last_error() -> ErrorCode {
    LAST_ERROR.with(|cell| *cell.borrow())
}

#[no_mangle]
pub extern "C" fn maskroute_last_error() -> ErrorCode {
    get_last_error()
}

/// Static, NUL-terminated description of `code`.
#[no_mangle]
pub extern "C" fn maskroute_strerror(code: ErrorCode) -> *const c_char {
    code.as_c_str().as_ptr() as *const c_char
}

// Map internal Error to ErrorCode
pub fn map_error(e: &Error) -> ErrorCode {
    match e {
        Error::InvalidInput(_) => ErrorCode::InvalidInput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn strerror_is_nul_terminated_and_matches_as_str() {
        for code in [
            ErrorCode::Success,
            ErrorCode::InvalidInput,
            ErrorCode::InvalidHandle,
            ErrorCode::Utf8Error,
            ErrorCode::NotFound,
            ErrorCode::Unknown,
        ] {
            let s = unsafe { CStr::from_ptr(maskroute_strerror(code)) };
            assert_eq!(s.to_str().unwrap(), code.as_str());
        }
    }

    #[test]
    fn last_error_is_per_thread() {
        set_last_error(ErrorCode::NotFound);
        std::thread::spawn(|| assert_eq!(get_last_error(), ErrorCode::Success))
            .join()
            .unwrap();
        assert_eq!(maskroute_last_error(), ErrorCode::NotFound);
    }

    #[test]
    fn invalid_input_maps_to_code() {
        let e = Error::InvalidInput("10.0.0.0/33".into());
        assert_eq!(map_error(&e), ErrorCode::InvalidInput);
        assert_eq!(e.to_string(), "invalid input: \"10.0.0.0/33\"");
    }
}
