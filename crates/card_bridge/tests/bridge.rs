//! Public-surface scenarios exercised exactly as a host would drive them,
//! without reaching into crate internals.

use std::path::PathBuf;
use std::sync::Mutex;

use card_bridge::{
    BridgeError, BridgeSettings, CardSubscribers, CardSurface, OpenOutcome, SessionState,
};

static TEST_LOCK: Mutex<()> = Mutex::new(());
static OPENED: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn recording_opener(url: &str) -> Result<(), BridgeError> {
    OPENED.lock().unwrap().push(url.to_string());
    Ok(())
}

fn settings_with_no_module() -> BridgeSettings {
    let mut settings = BridgeSettings::default();
    settings.module_paths = vec![PathBuf::from("/definitely/missing.so")];
    settings.module_dir = PathBuf::from("/nonexistent-card-modules");
    settings
}

#[test]
fn missing_module_opens_the_system_browser_exactly_once() {
    let _guard = TEST_LOCK.lock().unwrap();
    OPENED.lock().unwrap().clear();

    let mut surface =
        CardSurface::new(settings_with_no_module()).with_browser_opener(recording_opener);
    let outcome = surface
        .open("https://pay.example.com/checkout", None, CardSubscribers::default())
        .unwrap();

    assert_eq!(outcome, OpenOutcome::SystemBrowser);
    assert_eq!(
        OPENED.lock().unwrap().as_slice(),
        ["https://pay.example.com/checkout"]
    );
    assert!(!surface.is_active());
    assert_eq!(surface.session_state(), SessionState::Idle);
}

#[test]
fn browser_fallback_preserves_the_original_url_scheme_default() {
    let _guard = TEST_LOCK.lock().unwrap();
    OPENED.lock().unwrap().clear();

    let mut surface =
        CardSurface::new(settings_with_no_module()).with_browser_opener(recording_opener);
    surface
        .open("pay.example.com/checkout", None, CardSubscribers::default())
        .unwrap();

    assert_eq!(
        OPENED.lock().unwrap().as_slice(),
        ["https://pay.example.com/checkout"]
    );
}

#[test]
fn close_before_any_open_is_a_no_op() {
    let _guard = TEST_LOCK.lock().unwrap();

    let mut surface = CardSurface::new(settings_with_no_module());
    surface.close();
    surface.close();
    assert!(!surface.is_active());
}

#[test]
fn tick_before_any_open_is_a_no_op() {
    let _guard = TEST_LOCK.lock().unwrap();

    let mut surface = CardSurface::new(settings_with_no_module());
    surface.tick();
    assert!(!surface.is_active());
}
