//! Headless stub implementation of the native card module.
//!
//! Exports the full entry-point surface the bridge resolves
//! (`CreateCardWindow`, `DestroyCardWindow`, `PollCardNotification`,
//! `PumpCardMessages` and the four `Set*Callback` registrations) without
//! opening any real window. Useful for driving the bridge end-to-end on
//! machines with no embedded browser control, and as the reference for what
//! a real module must implement.
//!
//! Beyond the ABI proper, the stub exports `CardStubEmit*` entry points so a
//! host can simulate payment outcomes: each emit invokes the registered
//! callback when one is present and otherwise queues a notification for
//! `PollCardNotification`.

use std::collections::VecDeque;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use card_abi::{
    OptinEventCallback, PaymentEventCallback, RawCardHandle, NOTIFY_OPTIN_RESPONSE,
    NOTIFY_PAYMENT_FAILURE, NOTIFY_PAYMENT_SUCCESS, NOTIFY_PURCHASE_PROCESSING,
};

// ============================================================================
// Module state
// ============================================================================

struct RegisteredCallbacks {
    payment_success: Option<PaymentEventCallback>,
    payment_failure: Option<PaymentEventCallback>,
    purchase_processing: Option<PaymentEventCallback>,
    optin_response: Option<OptinEventCallback>,
}

impl RegisteredCallbacks {
    const fn empty() -> Self {
        Self {
            payment_success: None,
            payment_failure: None,
            purchase_processing: None,
            optin_response: None,
        }
    }
}

static CALLBACKS: Mutex<RegisteredCallbacks> = Mutex::new(RegisteredCallbacks::empty());
static NOTIFICATIONS: Mutex<VecDeque<(String, String)>> = Mutex::new(VecDeque::new());
static PUMP_CALLS: AtomicU64 = AtomicU64::new(0);

/// What a "window" is to the stub: the creation parameters, retained so the
/// handle round-trips like a real one.
struct StubWindow {
    #[allow(dead_code)]
    url: String,
    #[allow(dead_code)]
    rect: (f64, f64, f64, f64),
}

// ============================================================================
// Window entry points
// ============================================================================

/// # Safety
///
/// `url` must be null or a valid NUL-terminated string for the duration of
/// the call; it is copied before returning.
#[no_mangle]
pub unsafe extern "C" fn CreateCardWindow(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    url: *const c_char,
) -> RawCardHandle {
    if url.is_null() || width <= 0.0 || height <= 0.0 {
        return std::ptr::null_mut();
    }
    let url = CStr::from_ptr(url).to_string_lossy().into_owned();
    let window = Box::new(StubWindow { url, rect: (x, y, width, height) });
    Box::into_raw(window).cast::<c_void>()
}

/// # Safety
///
/// `handle` must be null or a handle previously returned by
/// `CreateCardWindow` that has not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn DestroyCardWindow(handle: RawCardHandle) {
    if handle.is_null() {
        return;
    }
    drop(Box::from_raw(handle.cast::<StubWindow>()));
}

/// # Safety
///
/// Both buffers must be writable for their stated lengths.
#[no_mangle]
pub unsafe extern "C" fn PollCardNotification(
    type_buf: *mut c_char,
    type_len: c_int,
    data_buf: *mut c_char,
    data_len: c_int,
) -> c_int {
    if type_buf.is_null() || data_buf.is_null() || type_len <= 0 || data_len <= 0 {
        return 0;
    }
    let next = match NOTIFICATIONS.lock() {
        Ok(mut queue) => queue.pop_front(),
        Err(_) => None,
    };
    match next {
        Some((kind, data)) => {
            write_c_string(type_buf, type_len, &kind);
            write_c_string(data_buf, data_len, &data);
            1
        }
        None => 0,
    }
}

#[no_mangle]
pub extern "C" fn PumpCardMessages() {
    // Nothing to pump without a real message loop; count the calls so tests
    // and hosts can observe the cadence.
    PUMP_CALLS.fetch_add(1, Ordering::SeqCst);
}

// ============================================================================
// Callback registration
// ============================================================================

#[no_mangle]
pub extern "C" fn SetPaymentSuccessCallback(callback: PaymentEventCallback) {
    if let Ok(mut callbacks) = CALLBACKS.lock() {
        callbacks.payment_success = Some(callback);
    }
}

#[no_mangle]
pub extern "C" fn SetPaymentFailureCallback(callback: PaymentEventCallback) {
    if let Ok(mut callbacks) = CALLBACKS.lock() {
        callbacks.payment_failure = Some(callback);
    }
}

#[no_mangle]
pub extern "C" fn SetPurchaseProcessingCallback(callback: PaymentEventCallback) {
    if let Ok(mut callbacks) = CALLBACKS.lock() {
        callbacks.purchase_processing = Some(callback);
    }
}

#[no_mangle]
pub extern "C" fn SetOptinResponseCallback(callback: OptinEventCallback) {
    if let Ok(mut callbacks) = CALLBACKS.lock() {
        callbacks.optin_response = Some(callback);
    }
}

// ============================================================================
// Simulation triggers
// ============================================================================

#[no_mangle]
pub extern "C" fn CardStubEmitPaymentSuccess() {
    emit(NOTIFY_PAYMENT_SUCCESS, "");
}

#[no_mangle]
pub extern "C" fn CardStubEmitPaymentFailure() {
    emit(NOTIFY_PAYMENT_FAILURE, "");
}

#[no_mangle]
pub extern "C" fn CardStubEmitPurchaseProcessing() {
    emit(NOTIFY_PURCHASE_PROCESSING, "");
}

/// # Safety
///
/// `optin_type` must be null or a valid NUL-terminated string for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn CardStubEmitOptinResponse(optin_type: *const c_char) {
    let kind = if optin_type.is_null() {
        String::new()
    } else {
        CStr::from_ptr(optin_type).to_string_lossy().into_owned()
    };
    emit(NOTIFY_OPTIN_RESPONSE, &kind);
}

enum Registered {
    Plain(PaymentEventCallback),
    Optin(OptinEventCallback),
}

/// Deliver through the registered callback when one exists, otherwise queue
/// for the polling path, the same either/or the real module implements.
fn emit(kind: &'static str, data: &str) {
    let registered = {
        let callbacks = match CALLBACKS.lock() {
            Ok(callbacks) => callbacks,
            Err(_) => return,
        };
        match kind {
            NOTIFY_PAYMENT_SUCCESS => callbacks.payment_success.map(Registered::Plain),
            NOTIFY_PAYMENT_FAILURE => callbacks.payment_failure.map(Registered::Plain),
            NOTIFY_PURCHASE_PROCESSING => callbacks.purchase_processing.map(Registered::Plain),
            NOTIFY_OPTIN_RESPONSE => callbacks.optin_response.map(Registered::Optin),
            _ => None,
        }
    };

    match registered {
        Some(Registered::Plain(callback)) => unsafe { callback() },
        Some(Registered::Optin(callback)) => {
            let data = CString::new(data).unwrap_or_default();
            unsafe { callback(data.as_ptr()) }
        }
        None => {
            if let Ok(mut queue) = NOTIFICATIONS.lock() {
                queue.push_back((kind.to_string(), data.to_string()));
            }
        }
    }
}

unsafe fn write_c_string(buf: *mut c_char, len: c_int, value: &str) {
    let capacity = (len - 1) as usize;
    let bytes = value.as_bytes();
    let n = bytes.len().min(capacity);
    std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, n);
    *buf.add(n) = 0;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::AtomicU32;

    // The stub's state is process-global like the real module's; serialize
    // the tests that touch it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn reset() {
        if let Ok(mut callbacks) = CALLBACKS.lock() {
            *callbacks = RegisteredCallbacks::empty();
        }
        if let Ok(mut queue) = NOTIFICATIONS.lock() {
            queue.clear();
        }
    }

    fn poll_once() -> Option<(String, String)> {
        let mut type_buf = [0u8; card_abi::NOTIFY_TYPE_BUF_LEN];
        let mut data_buf = [0u8; card_abi::NOTIFY_DATA_BUF_LEN];
        let pending = unsafe {
            PollCardNotification(
                type_buf.as_mut_ptr().cast::<c_char>(),
                card_abi::NOTIFY_TYPE_BUF_LEN as c_int,
                data_buf.as_mut_ptr().cast::<c_char>(),
                card_abi::NOTIFY_DATA_BUF_LEN as c_int,
            )
        };
        if pending == 0 {
            return None;
        }
        let read = |buf: &[u8]| {
            let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            String::from_utf8_lossy(&buf[..end]).into_owned()
        };
        Some((read(&type_buf), read(&data_buf)))
    }

    #[test]
    fn window_handles_round_trip() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();

        let url = CString::new("https://pay.example.com/checkout").unwrap();
        let handle = unsafe { CreateCardWindow(0.0, 0.0, 390.0, 844.0, url.as_ptr()) };
        assert!(!handle.is_null());
        unsafe { DestroyCardWindow(handle) };
    }

    #[test]
    fn invalid_creation_parameters_return_null() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();

        let url = CString::new("https://pay.example.com").unwrap();
        assert!(unsafe { CreateCardWindow(0.0, 0.0, 0.0, 844.0, url.as_ptr()) }.is_null());
        assert!(unsafe { CreateCardWindow(0.0, 0.0, 390.0, 844.0, std::ptr::null()) }.is_null());
    }

    #[test]
    fn unregistered_emits_queue_for_polling() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();

        CardStubEmitPaymentSuccess();
        let kind = CString::new("email").unwrap();
        unsafe { CardStubEmitOptinResponse(kind.as_ptr()) };

        assert_eq!(poll_once(), Some((NOTIFY_PAYMENT_SUCCESS.to_string(), String::new())));
        assert_eq!(poll_once(), Some((NOTIFY_OPTIN_RESPONSE.to_string(), "email".to_string())));
        assert_eq!(poll_once(), None);
    }

    #[test]
    fn registered_callback_preempts_the_poll_queue() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();

        static FIRED: AtomicU32 = AtomicU32::new(0);
        unsafe extern "C" fn on_success() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        FIRED.store(0, Ordering::SeqCst);
        SetPaymentSuccessCallback(on_success);
        CardStubEmitPaymentSuccess();

        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        assert_eq!(poll_once(), None);
    }

    #[test]
    fn poll_truncates_to_the_caller_buffer() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();

        let long = "x".repeat(card_abi::NOTIFY_DATA_BUF_LEN * 2);
        let kind = CString::new(long).unwrap();
        unsafe { CardStubEmitOptinResponse(kind.as_ptr()) };

        let (_, data) = poll_once().unwrap();
        assert_eq!(data.len(), card_abi::NOTIFY_DATA_BUF_LEN - 1);
    }
}
