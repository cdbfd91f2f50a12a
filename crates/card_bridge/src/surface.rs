//! The host-facing surface: open a card, tick it, close it.

use log::{debug, warn};

use crate::error::BridgeError;
use crate::events;
use crate::fallback::{self, BrowserOpener, FailurePoint, FallbackAction};
use crate::pump::MainLoopPump;
use crate::resolver::{self, NativeModule};
use crate::session::{CardRect, CardSubscribers, CloseReason, SessionState, SurfaceSession};
use crate::settings::BridgeSettings;

/// How an open request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A native card window was created; events flow through the bridge.
    NativeCard,
    /// Degraded to the system browser; no callbacks will be delivered.
    SystemBrowser,
}

/// Owner of the card surface lifecycle for one host.
///
/// Lives on the host's main thread. At most one session is active at a time;
/// opening a second surface closes the first synchronously before the new
/// window is created. The host must call [`CardSurface::tick`] once per
/// main-loop iteration; that is where queued native events are dispatched
/// to subscribers.
pub struct CardSurface {
    settings: BridgeSettings,
    module: Option<&'static NativeModule>,
    session: Option<SurfaceSession>,
    pump: MainLoopPump,
    browser_opener: BrowserOpener,
}

impl CardSurface {
    pub fn new(settings: BridgeSettings) -> Self {
        let pump = MainLoopPump::new(settings.pump_repeats);
        Self {
            settings,
            module: None,
            session: None,
            pump,
            browser_opener: fallback::open_in_system_browser,
        }
    }

    /// Replace the system-browser opener used on fallback, e.g. to route the
    /// URL through the host's own URL handler.
    pub fn with_browser_opener(mut self, opener: BrowserOpener) -> Self {
        self.browser_opener = opener;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_module(settings: BridgeSettings, module: &'static NativeModule) -> Self {
        let mut surface = Self::new(settings);
        surface.module = Some(module);
        surface
    }

    /// Open `url` on the native card surface, or degrade per the fallback
    /// policy. `geometry` defaults to the configured placement.
    ///
    /// Returns which path was taken. An `Err` means even the system-browser
    /// floor failed; the host is free to ignore it.
    pub fn open(
        &mut self,
        url: impl Into<String>,
        geometry: Option<CardRect>,
        subscribers: CardSubscribers,
    ) -> Result<OpenOutcome, BridgeError> {
        let url = normalize_url(url.into())?;

        // One active session per process: displace the previous card first.
        if self.session.is_some() {
            self.close_current(CloseReason::Displaced);
        }

        let module = match self.module {
            Some(module) => module,
            None => {
                let candidates = resolver::discover_candidates(&self.settings);
                match resolver::load_and_resolve(&candidates) {
                    Ok(module) => {
                        self.module = Some(module);
                        module
                    }
                    Err(error) => {
                        warn!("native card module unavailable: {}", error);
                        if let Some(outcome) = self.degrade(FailurePoint::ModuleUnusable, &url)? {
                            return Ok(outcome);
                        }
                        return Err(error);
                    }
                }
            }
        };

        let geometry = geometry.unwrap_or(self.settings.default_geometry);
        let mut session = SurfaceSession::new(module, url.clone(), geometry, subscribers);
        session.begin_loading();

        if !session.register_callbacks() {
            if let Some(outcome) = self.degrade(FailurePoint::CallbackSymbolsMissing, &url)? {
                return Ok(outcome);
            }
        }

        if let Err(error) = session.create_window() {
            warn!("{}", error);
            drop(session);
            if let Some(outcome) = self.degrade(FailurePoint::WindowCreationFailed, &url)? {
                return Ok(outcome);
            }
            return Err(error);
        }

        session.activate();
        self.session = Some(session);
        Ok(OpenOutcome::NativeCard)
    }

    /// Close the active card, if any. Idempotent.
    pub fn close(&mut self) {
        self.close_current(CloseReason::HostRequest);
    }

    /// Whether a card session is currently receiving events.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().map(|s| s.is_active()).unwrap_or(false)
    }

    /// The current session's lifecycle state. `Idle` when no session exists,
    /// both before the first open and after a session has fully closed.
    pub fn session_state(&self) -> SessionState {
        self.session.as_ref().map(|s| s.state()).unwrap_or(SessionState::Idle)
    }

    /// The per-tick hook for the host's main loop: pump the native message
    /// loop, poll for notifications when polling is armed, then drain the
    /// event queue and dispatch in arrival order. Terminal events close the
    /// session after their subscriber ran.
    pub fn tick(&mut self) {
        if let Some(module) = self.module {
            if self.is_active() || self.pump.polling_armed() {
                self.pump.pump_native(module);
                if self.pump.polling_armed() {
                    self.pump.poll_native(module);
                }
            }
        }

        // Drain unconditionally: a deferred native callback may fire after
        // the window is gone, and its event must not sit in the queue until
        // the next open.
        for event in events::drain_all() {
            let closed_by_terminal = match self.session.as_mut() {
                Some(session) if session.is_active() => {
                    let terminal = event.is_terminal();
                    session.dispatch(event);
                    if terminal {
                        session.close(CloseReason::TerminalEvent);
                    }
                    terminal
                }
                _ => {
                    debug!("discarding card event with no active session: {:?}", event);
                    false
                }
            };
            if closed_by_terminal {
                self.session = None;
                self.pump.disarm();
            }
        }
    }

    fn close_current(&mut self, reason: CloseReason) {
        if let Some(session) = self.session.as_mut() {
            session.close(reason);
        }
        self.session = None;
        self.pump.disarm();
    }

    /// Apply the fallback decision for `failure`. `Ok(Some(..))` means the
    /// open attempt is finished; `Ok(None)` means it may continue on the
    /// native path.
    fn degrade(
        &mut self,
        failure: FailurePoint,
        url: &str,
    ) -> Result<Option<OpenOutcome>, BridgeError> {
        match fallback::decide(failure) {
            FallbackAction::ArmPolling => {
                self.pump.arm_polling();
                Ok(None)
            }
            FallbackAction::SystemBrowser => {
                self.session = None;
                self.pump.disarm();
                (self.browser_opener)(url)?;
                Ok(Some(OpenOutcome::SystemBrowser))
            }
        }
    }
}

/// Reject empty URLs and default the scheme to https, matching what the
/// checkout backend hands out.
fn normalize_url(url: String) -> Result<String, BridgeError> {
    if url.is_empty() {
        return Err(BridgeError::InvalidUrl {
            message: "open requested with an empty URL".into(),
        });
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Ok(format!("https://{}", url))
    }
}

// ============================================================================
// Tests
// ============================================================================
