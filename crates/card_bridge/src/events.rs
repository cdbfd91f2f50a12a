//! Normalized events, the cross-thread event queue, and the callback
//! trampolines registered with the native module.
//!
//! The queue is the single concurrency-sensitive resource in the bridge:
//! trampolines (and the polling routine) push from whatever thread the native
//! module happens to call on, and the pump drains from the host's main
//! thread. Both sides hold the mutex only for the push or the buffer swap,
//! never across a subscriber dispatch.

use std::ffi::CStr;
use std::os::raw::c_char;

use card_abi::{
    NOTIFY_OPTIN_RESPONSE, NOTIFY_PAYMENT_FAILURE, NOTIFY_PAYMENT_SUCCESS,
    NOTIFY_PURCHASE_PROCESSING, OPTIN_DATA_MAX,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

// ============================================================================
// Normalized events
// ============================================================================

/// An event raised on the native surface, normalized for host delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    PaymentSuccess,
    PaymentFailure,
    PurchaseProcessing,
    /// Carries the opt-in kind chosen by the user. The payload is copied out
    /// of native memory at trampoline time and bounded by [`OPTIN_DATA_MAX`].
    OptinResponse(String),
}

impl CardEvent {
    /// Whether delivering this event closes the presenting surface.
    ///
    /// Policy table: success, failure and opt-in responses end the session;
    /// a processing notice keeps the card up while the backend settles.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::PaymentSuccess | Self::PaymentFailure | Self::OptinResponse(_) => true,
            Self::PurchaseProcessing => false,
        }
    }

    /// Translate a polled (type, data) notification pair into an event.
    /// Returns `None` for notification types this bridge does not know.
    pub(crate) fn from_notification(kind: &str, data: &str) -> Option<Self> {
        match kind {
            NOTIFY_PAYMENT_SUCCESS => Some(Self::PaymentSuccess),
            NOTIFY_PAYMENT_FAILURE => Some(Self::PaymentFailure),
            NOTIFY_PURCHASE_PROCESSING => Some(Self::PurchaseProcessing),
            NOTIFY_OPTIN_RESPONSE => Some(Self::OptinResponse(bounded(data))),
            _ => None,
        }
    }
}

// ============================================================================
// Event queue
// ============================================================================

// Process-global so the statically-addressable trampolines below can reach
// it. Consumed only by the main-loop pump.
static EVENT_QUEUE: Lazy<Mutex<Vec<CardEvent>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Push an event from any thread. FIFO order is the order in which pushes
/// acquired the mutex.
pub(crate) fn enqueue(event: CardEvent) {
    EVENT_QUEUE.lock().push(event);
}

/// Swap the queue contents out and return them, leaving the queue empty.
/// Main thread only.
pub(crate) fn drain_all() -> Vec<CardEvent> {
    let mut queue = EVENT_QUEUE.lock();
    std::mem::take(&mut *queue)
}

// ============================================================================
// Trampolines
// ============================================================================

// These are the function pointers handed to the native module's
// `Set*Callback` entry points. They may run on the embedded browser control's
// own worker or UI thread, so their bodies do nothing but normalize the
// arguments and push onto the queue. Producers only; subscriber dispatch
// happens on the next main-loop tick.

pub(crate) unsafe extern "C" fn payment_success_trampoline() {
    enqueue(CardEvent::PaymentSuccess);
}

pub(crate) unsafe extern "C" fn payment_failure_trampoline() {
    enqueue(CardEvent::PaymentFailure);
}

pub(crate) unsafe extern "C" fn purchase_processing_trampoline() {
    enqueue(CardEvent::PurchaseProcessing);
}

pub(crate) unsafe extern "C" fn optin_response_trampoline(optin_type: *const c_char) {
    // The native buffer is only valid for the duration of this call.
    let payload = if optin_type.is_null() {
        String::new()
    } else {
        bounded(&CStr::from_ptr(optin_type).to_string_lossy())
    };
    enqueue(CardEvent::OptinResponse(payload));
}

/// Copy at most [`OPTIN_DATA_MAX`] bytes of `raw`, respecting char
/// boundaries.
fn bounded(raw: &str) -> String {
    if raw.len() <= OPTIN_DATA_MAX {
        return raw.to_string();
    }
    let mut end = OPTIN_DATA_MAX;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

// ============================================================================
// Tests
// ============================================================================
