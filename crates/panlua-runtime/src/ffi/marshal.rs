//! Marshaling - host ↔ native conversions for dispatch arguments
//!
//! - [`NativeString`]: scoped null-terminated buffer for one native call
//! - [`copy_native_bytes`]: copy an engine-owned byte range into a host `String`
//!
//! # Memory Safety
//!
//! A `NativeString` owns its buffer and frees it on `Drop`, so the buffer is
//! released on every exit path of the call that created it. Dispatch creates
//! one immediately before the native call and lets it fall out of scope right
//! after, never retaining it across calls.
//!
//! Numbers need no conversion: `c_int`, `lua_Integer` and `lua_Number` are
//! `i32`, `i64` and `f64` on every supported target and are passed as-is.

use std::ffi::{CString, NulError};
use std::os::raw::c_char;
use std::path::Path;
use thiserror::Error;

/// Marshal error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// Host string contains a NUL byte and cannot be null-terminated
    #[error("String contains a NUL byte at position {position}")]
    InteriorNul { position: usize },

    /// Path is not representable as a native string on this platform
    #[error("Path is not valid UTF-8: {0}")]
    NonUnicodePath(String),
}

impl From<NulError> for MarshalError {
    fn from(e: NulError) -> Self {
        MarshalError::InteriorNul {
            position: e.nul_position(),
        }
    }
}

/// Scoped native string buffer
///
/// Either an owned null-terminated copy of a host string, or the native null
/// pointer when the host value was absent.
///
/// # Example
///
/// ```
/// # use panlua_runtime::ffi::marshal::NativeString;
/// let name = NativeString::new("x").unwrap();
/// assert!(!name.as_ptr().is_null());
///
/// let absent = NativeString::optional(None).unwrap();
/// assert!(absent.as_ptr().is_null());
/// ```
#[derive(Debug)]
pub struct NativeString {
    buffer: Option<CString>,
}

impl NativeString {
    /// Copy a host string into a null-terminated buffer
    pub fn new(s: &str) -> Result<Self, MarshalError> {
        Ok(Self {
            buffer: Some(CString::new(s)?),
        })
    }

    /// Marshal an optional string; `None` becomes the native null pointer
    pub fn optional(s: Option<&str>) -> Result<Self, MarshalError> {
        match s {
            Some(s) => Self::new(s),
            None => Ok(Self::null()),
        }
    }

    /// The native null pointer, no buffer allocated
    pub fn null() -> Self {
        Self { buffer: None }
    }

    /// Marshal a filesystem path, byte-exact on Unix
    pub fn from_path(path: &Path) -> Result<Self, MarshalError> {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            Ok(Self {
                buffer: Some(CString::new(path.as_os_str().as_bytes())?),
            })
        }

        #[cfg(not(unix))]
        {
            let s = path
                .to_str()
                .ok_or_else(|| MarshalError::NonUnicodePath(path.display().to_string()))?;
            Self::new(s)
        }
    }

    /// Pointer handed to the native call; valid while `self` is alive
    pub fn as_ptr(&self) -> *const c_char {
        self.buffer
            .as_ref()
            .map_or(std::ptr::null(), |buffer| buffer.as_ptr())
    }

    /// Whether this is the native null pointer
    pub fn is_null(&self) -> bool {
        self.buffer.is_none()
    }
}

/// Copy `len` bytes owned by the engine into a host string
///
/// Invalid UTF-8 is replaced rather than rejected, since Lua strings are
/// arbitrary byte sequences. Returns `None` for the null pointer.
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `len` bytes for the duration of
/// this call.
pub unsafe fn copy_native_bytes(ptr: *const c_char, len: usize) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    Some(String::from_utf8_lossy(bytes).into_owned())
}
