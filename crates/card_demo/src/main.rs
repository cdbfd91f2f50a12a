//! Demo host for the card bridge.
//!
//! Opens a checkout URL on the native card surface (or degrades to the
//! system browser) and runs a cooperative main loop that ticks the bridge,
//! the way an engine host would from its update callback.
//!
//! ```text
//! card_demo [-v|--verbose] [URL]
//! ```

mod appdata;
mod args;
mod logging;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use card_bridge::{BridgeSettings, CardSubscribers, CardSurface, OpenOutcome};
use tracing::{info, warn};

const DEFAULT_CHECKOUT_URL: &str = "https://pay.example.com/checkout/demo";

/// How long the demo keeps ticking while waiting for a terminal event.
const DEMO_TIMEOUT: Duration = Duration::from_secs(120);

/// Roughly one tick per frame at 60 Hz, like a host update loop.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    let parsed = args::parse_args();
    let _log_guard = logging::init(parsed.verbose);

    let paths = appdata::setup_appdata()?;
    let settings = BridgeSettings::load_or_default(&paths.settings_file);
    info!(
        "card demo starting (modules from {:?}, pump x{})",
        settings.module_dir, settings.pump_repeats
    );

    let mut surface = CardSurface::new(settings);

    let finished = Rc::new(Cell::new(false));
    let subscribers = CardSubscribers {
        on_success: Some(Box::new({
            let finished = finished.clone();
            move || {
                info!("payment succeeded");
                finished.set(true);
            }
        })),
        on_failure: Some(Box::new({
            let finished = finished.clone();
            move || {
                warn!("payment failed");
                finished.set(true);
            }
        })),
        on_processing: Some(Box::new(|| info!("purchase processing"))),
        on_optin: Some(Box::new({
            let finished = finished.clone();
            move |kind: &str| {
                info!("opt-in response: {kind}");
                finished.set(true);
            }
        })),
        on_dismiss: Some(Box::new({
            let finished = finished.clone();
            move || {
                info!("card dismissed");
                finished.set(true);
            }
        })),
    };

    let url = parsed.url.unwrap_or_else(|| DEFAULT_CHECKOUT_URL.to_string());
    match surface.open(url, None, subscribers) {
        Ok(OpenOutcome::NativeCard) => {
            info!("native card is up; entering the main loop");
            let started = Instant::now();
            while surface.is_active() && !finished.get() {
                surface.tick();
                if started.elapsed() > DEMO_TIMEOUT {
                    info!("demo timeout reached; closing the card");
                    break;
                }
                std::thread::sleep(TICK_INTERVAL);
            }
            surface.close();
            // One more tick drains anything a deferred native callback
            // pushed during teardown.
            surface.tick();
        }
        Ok(OpenOutcome::SystemBrowser) => {
            info!("opened in the system browser; no callbacks will be delivered");
        }
        Err(e) => {
            warn!("could not open the checkout surface: {e}");
        }
    }

    info!("card demo exiting");
    Ok(())
}
