//! Native module loading and symbol resolution.
//!
//! The bridge loads exactly one native module per process. Loading goes
//! through an ordered candidate list (explicit overrides, then a directory
//! scan, then the conventional file name) and symbol lookup is layered: the
//! platform-mangled spelling in the freshly loaded module, then the
//! process-global namespace, then the unmangled spelling in the same two
//! places. The layering exists because dynamic-module symbol visibility
//! differs across OS loaders, and because a host runtime may already have
//! mapped the same file under different visibility rules.
//!
//! Once a module loads successfully it is cached process-wide and NEVER
//! released. Native code may still dispatch a deferred callback after the
//! window is gone; keeping the code pages mapped makes that late call safe to
//! execute (the event lands in the queue and is discarded if no session
//! claims it). Unloading here would convert a harmless stale event into a
//! use-after-unload crash.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use card_abi::{
    CreateCardWindowFn, DestroyCardWindowFn, PollCardNotificationFn, PumpCardMessagesFn,
    SetOptinEventCallbackFn, SetPaymentEventCallbackFn, MODULE_STEM, SYM_CREATE_WINDOW,
    SYM_DESTROY_WINDOW, SYM_POLL_NOTIFICATION, SYM_PUMP_MESSAGES, SYM_SET_OPTIN_RESPONSE_CB,
    SYM_SET_PAYMENT_FAILURE_CB, SYM_SET_PAYMENT_SUCCESS_CB, SYM_SET_PURCHASE_PROCESSING_CB,
};
use libloading::Library;
use log::{debug, info, warn};

use crate::error::BridgeError;
use crate::settings::BridgeSettings;

// ============================================================================
// Symbol table
// ============================================================================

/// Resolved entry points of the native module. Every entry is independently
/// nullable; what is required depends on the caller (see
/// [`SymbolTable::window_symbols_complete`] and
/// [`SymbolTable::callbacks_complete`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolTable {
    pub create_window: Option<CreateCardWindowFn>,
    pub destroy_window: Option<DestroyCardWindowFn>,
    pub poll_notification: Option<PollCardNotificationFn>,
    pub pump_messages: Option<PumpCardMessagesFn>,
    pub set_payment_success_cb: Option<SetPaymentEventCallbackFn>,
    pub set_payment_failure_cb: Option<SetPaymentEventCallbackFn>,
    pub set_purchase_processing_cb: Option<SetPaymentEventCallbackFn>,
    pub set_optin_response_cb: Option<SetOptinEventCallbackFn>,
}

impl SymbolTable {
    /// The entry points without which no bridge is possible.
    pub fn window_symbols_complete(&self) -> bool {
        self.create_window.is_some()
            && self.destroy_window.is_some()
            && self.poll_notification.is_some()
    }

    /// Whether every callback-registration entry resolved. Partial
    /// registration is not a supported steady state: anything less than all
    /// four routes event delivery through the polling path instead.
    pub fn callbacks_complete(&self) -> bool {
        self.set_payment_success_cb.is_some()
            && self.set_payment_failure_cb.is_some()
            && self.set_purchase_processing_cb.is_some()
            && self.set_optin_response_cb.is_some()
    }

    fn missing_window_symbols(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.create_window.is_none() {
            missing.push(SYM_CREATE_WINDOW);
        }
        if self.destroy_window.is_none() {
            missing.push(SYM_DESTROY_WINDOW);
        }
        if self.poll_notification.is_none() {
            missing.push(SYM_POLL_NOTIFICATION);
        }
        missing
    }
}

// ============================================================================
// Native module
// ============================================================================

/// A loaded native module and its resolved symbols.
pub struct NativeModule {
    /// The dynamic library handle (must be kept alive for the life of the
    /// process; see the module-level notes).
    #[allow(dead_code)]
    library: Option<Library>,
    /// Resolved entry points.
    pub symbols: SymbolTable,
    /// The path the module was loaded from.
    pub path: PathBuf,
}

impl NativeModule {
    #[cfg(test)]
    pub(crate) fn for_tests(symbols: SymbolTable) -> Self {
        Self {
            library: None,
            symbols,
            path: PathBuf::from("<in-process mock>"),
        }
    }
}

// Cached for the life of the process; set once on the first successful load.
static NATIVE_MODULE: OnceLock<NativeModule> = OnceLock::new();

/// The already-loaded module, if any.
pub fn cached() -> Option<&'static NativeModule> {
    NATIVE_MODULE.get()
}

/// Load the native module from the first workable candidate path and resolve
/// its entry points. Subsequent calls in the same process reuse the cached
/// module and do not touch the loader again.
pub fn load_and_resolve(candidates: &[PathBuf]) -> Result<&'static NativeModule, BridgeError> {
    if let Some(module) = NATIVE_MODULE.get() {
        return Ok(module);
    }
    let module = load_uncached(candidates)?;
    Ok(NATIVE_MODULE.get_or_init(|| module))
}

fn load_uncached(candidates: &[PathBuf]) -> Result<NativeModule, BridgeError> {
    let mut failures = Vec::new();

    for path in candidates {
        let library = match load_library(path) {
            Ok(library) => library,
            Err(e) => {
                debug!("candidate module {:?} did not load: {}", path, e);
                failures.push(format!("{}: {}", path.display(), e));
                continue;
            }
        };

        let symbols = resolve_symbols(&library);
        if !symbols.window_symbols_complete() {
            // The file exists and loaded; a sibling candidate will not do
            // better. Report what is missing instead of scanning on.
            return Err(BridgeError::WindowSymbolsMissing {
                path: path.clone(),
                missing: symbols.missing_window_symbols(),
            });
        }

        info!(
            "loaded native card module from {:?} (callbacks {})",
            path,
            if symbols.callbacks_complete() { "registered via symbols" } else { "incomplete, polling required" }
        );
        return Ok(NativeModule {
            library: Some(library),
            symbols,
            path: path.clone(),
        });
    }

    Err(BridgeError::ModuleNotFound {
        attempted: candidates.to_vec(),
        message: failures.join("; "),
    })
}

#[cfg(unix)]
fn load_library(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY, RTLD_NOW};

    // Lazy binding with global visibility first, so a module the host maps
    // later can still see these symbols. Some loaders reject lazy mode for
    // hardened binaries; retry with eager binding before giving up.
    unsafe {
        UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL)
            .or_else(|_| UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL))
            .map(Library::from)
    }
}

#[cfg(windows)]
fn load_library(path: &Path) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

// ============================================================================
// Symbol lookup
// ============================================================================

fn resolve_symbols(library: &Library) -> SymbolTable {
    SymbolTable {
        create_window: lookup(library, SYM_CREATE_WINDOW),
        destroy_window: lookup(library, SYM_DESTROY_WINDOW),
        poll_notification: lookup(library, SYM_POLL_NOTIFICATION),
        pump_messages: lookup(library, SYM_PUMP_MESSAGES),
        set_payment_success_cb: lookup(library, SYM_SET_PAYMENT_SUCCESS_CB),
        set_payment_failure_cb: lookup(library, SYM_SET_PAYMENT_FAILURE_CB),
        set_purchase_processing_cb: lookup(library, SYM_SET_PURCHASE_PROCESSING_CB),
        set_optin_response_cb: lookup(library, SYM_SET_OPTIN_RESPONSE_CB),
    }
}

fn lookup<T: Copy>(library: &Library, logical_name: &str) -> Option<T> {
    for name in name_candidates(logical_name) {
        // The freshly loaded module first: its symbols are visible through
        // this handle even when the loader mapped them locally.
        if let Some(found) = get_from(library, &name) {
            return Some(found);
        }
        // Then the process-global namespace, covering the case where the
        // host already loaded the same file under a different handle.
        if let Some(found) = get_from_process(&name) {
            debug!("resolved `{}` from the process-global namespace", name);
            return Some(found);
        }
    }
    None
}

/// The spellings to try for one logical symbol. Some loaders expose C symbols
/// with a leading underscore; try the platform's likely spelling first and
/// the other second.
fn name_candidates(name: &str) -> [String; 2] {
    if cfg!(target_os = "macos") {
        [format!("_{}", name), name.to_string()]
    } else {
        [name.to_string(), format!("_{}", name)]
    }
}

fn get_from<T: Copy>(library: &Library, name: &str) -> Option<T> {
    unsafe { library.get::<T>(name.as_bytes()).ok().map(|symbol| *symbol) }
}

#[cfg(unix)]
fn get_from_process<T: Copy>(name: &str) -> Option<T> {
    use libloading::os::unix::Library as UnixLibrary;

    let this = UnixLibrary::this();
    unsafe { this.get::<T>(name.as_bytes()).ok().map(|symbol| *symbol) }
}

#[cfg(windows)]
fn get_from_process<T: Copy>(name: &str) -> Option<T> {
    use libloading::os::windows::Library as WindowsLibrary;

    let this = WindowsLibrary::this().ok()?;
    unsafe { this.get::<T>(name.as_bytes()).ok().map(|symbol| *symbol) }
}

// ============================================================================
// Candidate discovery
// ============================================================================

/// Build the ordered candidate list for [`load_and_resolve`]: explicit
/// override paths from settings, then dynamic libraries found in the module
/// directory whose file stem matches the conventional name, then the
/// conventional path itself.
pub fn discover_candidates(settings: &BridgeSettings) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf, candidates: &mut Vec<PathBuf>| {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    };

    for path in &settings.module_paths {
        push(path.clone(), &mut candidates);
    }

    // Get the appropriate file extension for this platform
    #[cfg(target_os = "windows")]
    let extension = "dll";
    #[cfg(target_os = "macos")]
    let extension = "dylib";
    #[cfg(all(unix, not(target_os = "macos")))]
    let extension = "so";

    if settings.module_dir.exists() {
        for entry in walkdir::WalkDir::new(&settings.module_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(extension) {
                continue;
            }
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.contains(MODULE_STEM))
                .unwrap_or(false);
            if stem_matches {
                push(path.to_path_buf(), &mut candidates);
            }
        }
    } else {
        warn!("module directory does not exist: {:?}", settings.module_dir);
    }

    push(settings.module_dir.join(conventional_module_name()), &mut candidates);
    candidates
}

/// The conventional file name of the native module on this platform.
pub(crate) fn conventional_module_name() -> String {
    #[cfg(target_os = "windows")]
    return format!("{}.dll", MODULE_STEM);
    #[cfg(target_os = "macos")]
    return format!("lib{}.dylib", MODULE_STEM);
    #[cfg(all(unix, not(target_os = "macos")))]
    return format!("lib{}.so", MODULE_STEM);
}

// ============================================================================
// Tests
// ============================================================================
