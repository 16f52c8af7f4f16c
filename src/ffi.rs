//! FFI bindings for Gluco Flux
//!
//! This module provides C-compatible functions for calling Gluco Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `gluco_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::DEFAULT_WINDOW_DAYS;
use crate::messaging::{markdown_to_html, split};
use crate::pipeline::{readings_to_analysis, GlucoseProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("Output contains an interior NUL byte");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze reading records (JSON array or NDJSON) and return the result JSON.
///
/// A negative `window_days` selects the default window; `0` analyzes all readings.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `gluco_free_string`.
/// - Returns NULL on error; call `gluco_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gluco_analyze_json(json: *const c_char, window_days: i32) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let window = u32::try_from(window_days).unwrap_or(DEFAULT_WINDOW_DAYS);

    match readings_to_analysis(json_str, window) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Split a message into chunks and return them as a JSON array of strings.
///
/// `max_length` values below 1 are treated as 1.
///
/// # Safety
/// - `message` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `gluco_free_string`.
/// - Returns NULL on error; call `gluco_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gluco_split_message(
    message: *const c_char,
    max_length: i32,
) -> *mut c_char {
    clear_last_error();

    let message_str = match cstr_to_string(message) {
        Some(s) => s,
        None => {
            set_last_error("Invalid message string pointer");
            return ptr::null_mut();
        }
    };

    let chunks = split(&message_str, usize::try_from(max_length).unwrap_or(1));

    match serde_json::to_string(&chunks) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Convert markdown to the chat HTML subset.
///
/// # Safety
/// - `markdown` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `gluco_free_string`.
/// - Returns NULL on error; call `gluco_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gluco_markdown_to_html(markdown: *const c_char) -> *mut c_char {
    clear_last_error();

    match cstr_to_string(markdown) {
        Some(s) => string_to_cstr(&markdown_to_html(&s)),
        None => {
            set_last_error("Invalid markdown string pointer");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Configured Processor API
// ============================================================================

/// Opaque handle to a GlucoseProcessor
pub struct GlucoseProcessorHandle {
    processor: GlucoseProcessor,
}

/// Create a processor from a configuration JSON document, or defaults when NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `gluco_processor_free`.
/// - Returns NULL on error; call `gluco_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gluco_processor_new(
    config_json: *const c_char,
) -> *mut GlucoseProcessorHandle {
    clear_last_error();

    let mut processor = GlucoseProcessor::new();

    if !config_json.is_null() {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        if let Err(e) = processor.load_config(&json_str) {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    }

    Box::into_raw(Box::new(GlucoseProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `gluco_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gluco_processor_free(processor: *mut GlucoseProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Analyze reading records with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `gluco_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `gluco_free_string`.
/// - Returns NULL on error; call `gluco_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gluco_processor_analyze(
    processor: *const GlucoseProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Gluco Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Gluco Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gluco_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Gluco Flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn gluco_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn gluco_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
