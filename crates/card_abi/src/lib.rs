//! # Card Native ABI
//!
//! This crate pins down the C ABI shared between the host-side bridge and the
//! platform-native card module (the dynamic library that owns the embedded
//! browser window). Both sides compile against these types and names:
//!
//! - The bridge resolves the exported symbols by the names defined here and
//!   calls them through the function-pointer aliases.
//! - The native module exports entry points with exactly these names and
//!   signatures (see `plugins/card_stub_module` for the reference stub).
//!
//! ## Stability
//!
//! Everything in this crate is part of the wire contract with already-shipped
//! native modules. Renaming a symbol or changing a signature is a breaking
//! change for every module in the field; add new entry points instead.

use std::os::raw::{c_char, c_int, c_void};

// ============================================================================
// Handles
// ============================================================================

/// Opaque handle to a native card window.
///
/// Owned by the native module; the bridge only stores it between
/// `CreateCardWindow` and `DestroyCardWindow` and never dereferences it.
pub type RawCardHandle = *mut c_void;

// ============================================================================
// Window entry points
// ============================================================================

/// `CreateCardWindow(x, y, width, height, url) -> handle`
///
/// Returns null on failure. `url` is a NUL-terminated UTF-8 string that the
/// module must copy before returning; the bridge does not keep it alive.
pub type CreateCardWindowFn =
    unsafe extern "C" fn(x: f64, y: f64, width: f64, height: f64, url: *const c_char) -> RawCardHandle;

/// `DestroyCardWindow(handle)`
///
/// Must tolerate a handle whose window was already closed natively.
pub type DestroyCardWindowFn = unsafe extern "C" fn(handle: RawCardHandle);

/// `PollCardNotification(type_buf, type_len, data_buf, data_len) -> int`
///
/// Pops one pending notification into the caller-owned buffers and returns
/// non-zero, or returns 0 when the module-side queue is empty. Both strings
/// are NUL-terminated and truncated to the given buffer lengths.
pub type PollCardNotificationFn = unsafe extern "C" fn(
    type_buf: *mut c_char,
    type_len: c_int,
    data_buf: *mut c_char,
    data_len: c_int,
) -> c_int;

/// `PumpCardMessages()`
///
/// Drives the module's internal message loop once. Only exported on platforms
/// whose embedded browser control does not pump itself; the bridge treats the
/// symbol as optional.
pub type PumpCardMessagesFn = unsafe extern "C" fn();

// ============================================================================
// Callback registration
// ============================================================================

/// Parameterless event callback invoked by the native module. May be called
/// from any thread the module owns.
pub type PaymentEventCallback = unsafe extern "C" fn();

/// Opt-in response callback. `optin_type` is a NUL-terminated string whose
/// buffer is only valid for the duration of the call; the receiver must copy.
pub type OptinEventCallback = unsafe extern "C" fn(optin_type: *const c_char);

/// `Set*Callback(fn)` for the three parameterless event kinds.
pub type SetPaymentEventCallbackFn = unsafe extern "C" fn(callback: PaymentEventCallback);

/// `SetOptinResponseCallback(fn)`.
pub type SetOptinEventCallbackFn = unsafe extern "C" fn(callback: OptinEventCallback);

// ============================================================================
// Exported symbol names
// ============================================================================

pub const SYM_CREATE_WINDOW: &str = "CreateCardWindow";
pub const SYM_DESTROY_WINDOW: &str = "DestroyCardWindow";
pub const SYM_POLL_NOTIFICATION: &str = "PollCardNotification";
pub const SYM_PUMP_MESSAGES: &str = "PumpCardMessages";
pub const SYM_SET_PAYMENT_SUCCESS_CB: &str = "SetPaymentSuccessCallback";
pub const SYM_SET_PAYMENT_FAILURE_CB: &str = "SetPaymentFailureCallback";
pub const SYM_SET_PURCHASE_PROCESSING_CB: &str = "SetPurchaseProcessingCallback";
pub const SYM_SET_OPTIN_RESPONSE_CB: &str = "SetOptinResponseCallback";

/// Conventional file stem of the native module (`libcard_surface_native.so`,
/// `card_surface_native.dll`, `libcard_surface_native.dylib`).
pub const MODULE_STEM: &str = "card_surface_native";

// ============================================================================
// Notification type names (polling path)
// ============================================================================

// The same four event kinds delivered through `PollCardNotification` when
// function-pointer registration is unavailable.

pub const NOTIFY_PAYMENT_SUCCESS: &str = "CardPaymentSuccess";
pub const NOTIFY_PAYMENT_FAILURE: &str = "CardPaymentFailure";
pub const NOTIFY_PURCHASE_PROCESSING: &str = "CardPurchaseProcessing";
pub const NOTIFY_OPTIN_RESPONSE: &str = "CardOptinResponse";

/// Caller buffer length for the notification type name, NUL included.
pub const NOTIFY_TYPE_BUF_LEN: usize = 64;

/// Caller buffer length for the notification payload, NUL included.
pub const NOTIFY_DATA_BUF_LEN: usize = 192;

/// Upper bound on an opt-in payload copied out of native memory. Matches the
/// polling buffer so both delivery paths agree on the limit.
pub const OPTIN_DATA_MAX: usize = NOTIFY_DATA_BUF_LEN;
