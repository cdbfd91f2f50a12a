//! In-process stand-in for the native module, used by the unit tests.
//!
//! The mock is the same function-pointer table the resolver would have
//! produced, backed by static recording state instead of a real window.
//! Everything here is process-global (the ABI forces that), so tests that
//! touch it serialize on [`serialize`] and start with [`reset`].

use std::collections::VecDeque;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicU32, Ordering};

use card_abi::{OptinEventCallback, PaymentEventCallback, RawCardHandle};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};

use crate::error::BridgeError;
use crate::resolver::{NativeModule, SymbolTable};

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static CALLS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));
static OPENED: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));
static POLL_FEED: Lazy<Mutex<VecDeque<(String, String)>>> = Lazy::new(|| Mutex::new(VecDeque::new()));
static REGISTERED: Lazy<Mutex<Registered>> = Lazy::new(|| Mutex::new(Registered::default()));
static PUMP_CALLS: AtomicU32 = AtomicU32::new(0);

#[derive(Default)]
#[allow(dead_code)] // only the success slot is read back by tests today
struct Registered {
    success: Option<PaymentEventCallback>,
    failure: Option<PaymentEventCallback>,
    processing: Option<PaymentEventCallback>,
    optin: Option<OptinEventCallback>,
}

/// Serialize tests that touch the process-global mock and event-queue state.
pub(crate) fn serialize() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock()
}

/// Clear all recorded state, including the bridge's event queue.
pub(crate) fn reset() {
    CALLS.lock().clear();
    OPENED.lock().clear();
    POLL_FEED.lock().clear();
    *REGISTERED.lock() = Registered::default();
    PUMP_CALLS.store(0, Ordering::SeqCst);
    crate::events::drain_all();
}

pub(crate) fn calls() -> Vec<String> {
    CALLS.lock().clone()
}

pub(crate) fn opened_urls() -> Vec<String> {
    OPENED.lock().clone()
}

pub(crate) fn pump_calls() -> u32 {
    PUMP_CALLS.load(Ordering::SeqCst)
}

pub(crate) fn feed_notification(kind: &str, data: &str) {
    POLL_FEED.lock().push_back((kind.to_string(), data.to_string()));
}

pub(crate) fn registered_success() -> Option<PaymentEventCallback> {
    REGISTERED.lock().success
}

/// A browser opener that records instead of launching anything.
pub(crate) fn recording_opener(url: &str) -> Result<(), BridgeError> {
    OPENED.lock().push(url.to_string());
    Ok(())
}

// ============================================================================
// Mock entry points
// ============================================================================

unsafe extern "C" fn create_window(
    _x: f64,
    _y: f64,
    _width: f64,
    _height: f64,
    url: *const c_char,
) -> RawCardHandle {
    let url = if url.is_null() {
        String::new()
    } else {
        CStr::from_ptr(url).to_string_lossy().into_owned()
    };
    CALLS.lock().push(format!("create:{}", url));
    // A sentinel the bridge stores but never dereferences.
    1usize as RawCardHandle
}

unsafe extern "C" fn create_window_null(
    _x: f64,
    _y: f64,
    _width: f64,
    _height: f64,
    url: *const c_char,
) -> RawCardHandle {
    let url = if url.is_null() {
        String::new()
    } else {
        CStr::from_ptr(url).to_string_lossy().into_owned()
    };
    CALLS.lock().push(format!("create:{}", url));
    std::ptr::null_mut()
}

unsafe extern "C" fn destroy_window(_handle: RawCardHandle) {
    CALLS.lock().push("destroy".to_string());
}

unsafe extern "C" fn poll_notification(
    type_buf: *mut c_char,
    type_len: c_int,
    data_buf: *mut c_char,
    data_len: c_int,
) -> c_int {
    let next = POLL_FEED.lock().pop_front();
    match next {
        Some((kind, data)) => {
            write_c_string(type_buf, type_len, &kind);
            write_c_string(data_buf, data_len, &data);
            1
        }
        None => 0,
    }
}

unsafe extern "C" fn pump_messages() {
    PUMP_CALLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn set_success(callback: PaymentEventCallback) {
    REGISTERED.lock().success = Some(callback);
    CALLS.lock().push("set_success".to_string());
}

unsafe extern "C" fn set_failure(callback: PaymentEventCallback) {
    REGISTERED.lock().failure = Some(callback);
    CALLS.lock().push("set_failure".to_string());
}

unsafe extern "C" fn set_processing(callback: PaymentEventCallback) {
    REGISTERED.lock().processing = Some(callback);
    CALLS.lock().push("set_processing".to_string());
}

unsafe extern "C" fn set_optin(callback: OptinEventCallback) {
    REGISTERED.lock().optin = Some(callback);
    CALLS.lock().push("set_optin".to_string());
}

unsafe fn write_c_string(buf: *mut c_char, len: c_int, value: &str) {
    if buf.is_null() || len <= 0 {
        return;
    }
    let capacity = (len - 1) as usize;
    let bytes = value.as_bytes();
    let n = bytes.len().min(capacity);
    std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
    *buf.add(n) = 0;
}

// ============================================================================
// Table builders
// ============================================================================

pub(crate) fn full_table() -> SymbolTable {
    SymbolTable {
        create_window: Some(create_window),
        destroy_window: Some(destroy_window),
        poll_notification: Some(poll_notification),
        pump_messages: Some(pump_messages),
        set_payment_success_cb: Some(set_success),
        set_payment_failure_cb: Some(set_failure),
        set_purchase_processing_cb: Some(set_processing),
        set_optin_response_cb: Some(set_optin),
    }
}

pub(crate) fn table_without_callbacks() -> SymbolTable {
    SymbolTable {
        set_payment_success_cb: None,
        set_payment_failure_cb: None,
        set_purchase_processing_cb: None,
        set_optin_response_cb: None,
        ..full_table()
    }
}

pub(crate) fn table_with_null_create() -> SymbolTable {
    SymbolTable {
        create_window: Some(create_window_null),
        ..full_table()
    }
}

/// A leaked module reference, matching the `'static` lifetime the resolver
/// hands out for the real thing.
pub(crate) fn module_with(symbols: SymbolTable) -> &'static NativeModule {
    Box::leak(Box::new(NativeModule::for_tests(symbols)))
}
