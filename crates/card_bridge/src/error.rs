//! Error taxonomy for the surface bridge.
//
// Every failure in this crate is reported as data; nothing panics across the
// bridge boundary. The worst case for the host is degradation to a plain
// browser tab with no callback delivery.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while bringing up or tearing down a card surface.
#[derive(Debug, Clone)]
pub enum BridgeError {
    /// No candidate path produced a loadable native module.
    ModuleNotFound {
        attempted: Vec<PathBuf>,
        message: String,
    },

    /// The module loaded but lacks the window entry points; no bridge is
    /// possible through it.
    WindowSymbolsMissing {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    /// The native window call returned null.
    WindowCreationFailed { url: String },

    /// The system URL handler could not be launched.
    BrowserOpenFailed { url: String, message: String },

    /// The open request carried an unusable URL.
    InvalidUrl { message: String },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleNotFound { attempted, message } => {
                write!(f, "no native card module found (tried {:?}): {}", attempted, message)
            }
            Self::WindowSymbolsMissing { path, missing } => {
                write!(f, "module {:?} is missing window symbols: {}", path, missing.join(", "))
            }
            Self::WindowCreationFailed { url } => {
                write!(f, "native window creation failed for {}", url)
            }
            Self::BrowserOpenFailed { url, message } => {
                write!(f, "failed to open {} in the system browser: {}", url, message)
            }
            Self::InvalidUrl { message } => {
                write!(f, "invalid card URL: {}", message)
            }
        }
    }
}

impl std::error::Error for BridgeError {}
