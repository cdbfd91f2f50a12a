//! Degradation policy for bridge failures.
//!
//! No failure here is allowed to reach the host as a panic or a hard error.
//! The decision table is small and closed: either the native surface can
//! still work (arm polling) or it cannot (hand the URL to the system browser
//! and accept that no callbacks will be delivered).

use log::info;

use crate::error::BridgeError;

/// What to do at a given failure point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    /// Abandon the native surface; open the URL with the OS default handler.
    SystemBrowser,
    /// Keep the native surface; deliver events by polling instead of
    /// registered callbacks.
    ArmPolling,
}

/// The failure points the bridge can hit while opening a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailurePoint {
    /// The module did not load, or loaded without its window entry points.
    ModuleUnusable,
    /// The module loaded but some callback-registration symbol is absent.
    CallbackSymbolsMissing,
    /// `create_window` returned null.
    WindowCreationFailed,
}

/// The decision table from the bridge design: everything that makes a native
/// window impossible degrades to the system browser; an incomplete callback
/// surface alone only changes the delivery mechanism.
pub(crate) fn decide(failure: FailurePoint) -> FallbackAction {
    match failure {
        FailurePoint::ModuleUnusable => FallbackAction::SystemBrowser,
        FailurePoint::CallbackSymbolsMissing => FallbackAction::ArmPolling,
        FailurePoint::WindowCreationFailed => FallbackAction::SystemBrowser,
    }
}

/// Signature of the system-browser opener used when the native surface is
/// abandoned. Replaceable via [`crate::CardSurface::with_browser_opener`] so
/// hosts can route the URL through their own handler.
pub type BrowserOpener = fn(&str) -> Result<(), BridgeError>;

/// Default opener: the OS URL handler.
pub fn open_in_system_browser(url: &str) -> Result<(), BridgeError> {
    info!("opening {} in the system browser", url);
    open::that(url).map_err(|e| BridgeError::BrowserOpenFailed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        assert_eq!(decide(FailurePoint::ModuleUnusable), FallbackAction::SystemBrowser);
        assert_eq!(decide(FailurePoint::CallbackSymbolsMissing), FallbackAction::ArmPolling);
        assert_eq!(decide(FailurePoint::WindowCreationFailed), FallbackAction::SystemBrowser);
    }
}
