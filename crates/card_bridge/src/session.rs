//! One native card window's lifecycle, from open to teardown.

use std::ffi::CString;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::events::{self, CardEvent};
use crate::resolver::NativeModule;

// ============================================================================
// Geometry
// ============================================================================

/// Screen-space placement of the card window, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CardRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

// ============================================================================
// Subscribers
// ============================================================================

/// Host-side callback slots, each invoked on the main thread from the pump.
///
/// The first four map one-to-one to [`CardEvent`] kinds. `on_dismiss` fires
/// exactly once when the session closes without a terminal event having been
/// delivered (host-requested close, displacement by a newer session, or
/// surface teardown).
#[derive(Default)]
pub struct CardSubscribers {
    pub on_success: Option<Box<dyn FnMut()>>,
    pub on_failure: Option<Box<dyn FnMut()>>,
    pub on_processing: Option<Box<dyn FnMut()>>,
    pub on_optin: Option<Box<dyn FnMut(&str)>>,
    pub on_dismiss: Option<Box<dyn FnMut()>>,
}

// ============================================================================
// State machine
// ============================================================================

/// Lifecycle states of a surface session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    CallbacksRegistered,
    WindowCreated,
    Active,
    Closing,
    Closed,
}

/// Why a session is being closed. Only affects logging; the dismiss decision
/// is keyed off whether a terminal event was already delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    HostRequest,
    TerminalEvent,
    Displaced,
    Teardown,
}

/// Owns one native window: creation parameters, the opaque handle, and the
/// subscribers to invoke on each event kind.
pub(crate) struct SurfaceSession {
    state: SessionState,
    module: &'static NativeModule,
    window: card_abi::RawCardHandle,
    url: String,
    geometry: CardRect,
    subscribers: CardSubscribers,
    terminal_dispatched: bool,
}

impl SurfaceSession {
    pub(crate) fn new(
        module: &'static NativeModule,
        url: String,
        geometry: CardRect,
        subscribers: CardSubscribers,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            module,
            window: std::ptr::null_mut(),
            url,
            geometry,
            subscribers,
            terminal_dispatched: false,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub(crate) fn begin_loading(&mut self) {
        debug!("card session loading for {}", self.url);
        self.state = SessionState::Loading;
    }

    /// Hand the trampoline function pointers to the module. Best-effort: when
    /// any registration symbol is absent the session still advances and the
    /// caller must arm the polling path instead. Returns whether registration
    /// happened.
    pub(crate) fn register_callbacks(&mut self) -> bool {
        let symbols = &self.module.symbols;
        let registered = match (
            symbols.set_payment_success_cb,
            symbols.set_payment_failure_cb,
            symbols.set_purchase_processing_cb,
            symbols.set_optin_response_cb,
        ) {
            (Some(set_success), Some(set_failure), Some(set_processing), Some(set_optin)) => {
                unsafe {
                    set_success(events::payment_success_trampoline);
                    set_failure(events::payment_failure_trampoline);
                    set_processing(events::purchase_processing_trampoline);
                    set_optin(events::optin_response_trampoline);
                }
                debug!("card callbacks registered with the native module");
                true
            }
            _ => {
                warn!("card module lacks callback registration symbols; events will be polled");
                false
            }
        };
        self.state = SessionState::CallbacksRegistered;
        registered
    }

    /// Ask the module for a window. Callback registration must already have
    /// happened so that messages from an eagerly loading page find the
    /// trampolines armed.
    pub(crate) fn create_window(&mut self) -> Result<(), BridgeError> {
        let create = match self.module.symbols.create_window {
            Some(f) => f,
            None => return Err(self.creation_failure()),
        };
        let url = match CString::new(self.url.as_str()) {
            Ok(url) => url,
            Err(_) => return Err(self.creation_failure()),
        };

        let CardRect { x, y, width, height } = self.geometry;
        // The module copies the URL before returning; `url` only needs to
        // outlive the call.
        let handle = unsafe { create(x, y, width, height, url.as_ptr()) };
        if handle.is_null() {
            return Err(self.creation_failure());
        }

        self.window = handle;
        self.state = SessionState::WindowCreated;
        Ok(())
    }

    fn creation_failure(&mut self) -> BridgeError {
        self.state = SessionState::Closed;
        BridgeError::WindowCreationFailed { url: self.url.clone() }
    }

    pub(crate) fn activate(&mut self) {
        info!("card session active for {}", self.url);
        self.state = SessionState::Active;
    }

    /// Invoke the subscriber matching `event`. Terminal-close handling is the
    /// pump's job; this only records that a terminal event went out so the
    /// later close skips the dismiss notice.
    pub(crate) fn dispatch(&mut self, event: CardEvent) {
        if event.is_terminal() {
            self.terminal_dispatched = true;
        }
        match event {
            CardEvent::PaymentSuccess => Self::notify(&mut self.subscribers.on_success, "payment success"),
            CardEvent::PaymentFailure => Self::notify(&mut self.subscribers.on_failure, "payment failure"),
            CardEvent::PurchaseProcessing => {
                Self::notify(&mut self.subscribers.on_processing, "purchase processing")
            }
            CardEvent::OptinResponse(kind) => match self.subscribers.on_optin.as_mut() {
                Some(callback) => callback(&kind),
                None => debug!("no subscriber for opt-in response event"),
            },
        }
    }

    fn notify(slot: &mut Option<Box<dyn FnMut()>>, label: &str) {
        match slot.as_mut() {
            Some(callback) => callback(),
            None => debug!("no subscriber for {} event", label),
        }
    }

    /// Destroy the native window and settle the state machine. Idempotent:
    /// repeated calls after `Closed` are no-ops, and `destroy_window` runs at
    /// most once per created window. The native module itself stays loaded.
    pub(crate) fn close(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;
        debug!("closing card session ({:?})", reason);

        if !self.window.is_null() {
            if let Some(destroy) = self.module.symbols.destroy_window {
                // Tolerates a window the user already closed natively.
                unsafe { destroy(self.window) };
            }
            self.window = std::ptr::null_mut();
        }

        if !self.terminal_dispatched {
            if let Some(callback) = self.subscribers.on_dismiss.as_mut() {
                callback();
            }
        }
        self.state = SessionState::Closed;
    }
}

impl Drop for SurfaceSession {
    fn drop(&mut self) {
        self.close(CloseReason::Teardown);
    }
}

// ============================================================================
// Tests
// ============================================================================
