//! # Card Bridge
//!
//! This crate hosts the native checkout-card surface bridge: it loads the
//! platform-native dynamic module that implements the embedded browser
//! window, resolves its C entry points, registers callback trampolines across
//! the FFI boundary, and relays the resulting events back into the host's
//! single-threaded main loop.
//!
//! The host-facing surface is [`CardSurface`]:
//!
//! ```rust,ignore
//! use card_bridge::{BridgeSettings, CardSubscribers, CardSurface};
//!
//! let mut surface = CardSurface::new(BridgeSettings::default());
//! let subscribers = CardSubscribers {
//!     on_success: Some(Box::new(|| println!("paid"))),
//!     ..Default::default()
//! };
//! surface.open("https://pay.example.com/checkout", None, subscribers)?;
//!
//! // Once per host main-loop iteration:
//! surface.tick();
//! ```
//!
//! ## Threading contract
//!
//! `CardSurface` must live on the host's main thread: `open`, `close` and
//! `tick` are main-thread-only, and subscribers are always invoked from
//! `tick`. Native code may deliver events from any thread it owns; those
//! arrivals only ever touch the internal mutex-guarded event queue and are
//! handed to subscribers on the next tick.
//!
//! ## Degradation
//!
//! No failure in this crate is fatal to the host. When the native module is
//! absent, incomplete, or refuses to create a window, the URL is handed to
//! the system browser instead and the bridge reports which path was taken.

mod error;
mod events;
mod fallback;
mod pump;
mod resolver;
mod session;
mod settings;
mod surface;

#[cfg(test)]
pub(crate) mod mock_native;

pub use error::BridgeError;
pub use events::CardEvent;
pub use fallback::{open_in_system_browser, BrowserOpener, FallbackAction};
pub use resolver::{discover_candidates, load_and_resolve, NativeModule, SymbolTable};
pub use session::{CardRect, CardSubscribers, SessionState};
pub use settings::BridgeSettings;
pub use surface::{CardSurface, OpenOutcome};
