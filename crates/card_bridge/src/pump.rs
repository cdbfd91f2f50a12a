//! Per-tick work hooked into the host's main loop.

use std::os::raw::{c_char, c_int};

use card_abi::{NOTIFY_DATA_BUF_LEN, NOTIFY_TYPE_BUF_LEN};
use log::{info, warn};

use crate::events::{self, CardEvent};
use crate::resolver::NativeModule;

/// Drives the native module once per host main-loop iteration: pumps the
/// module's internal message loop where the platform needs it, drains the
/// module-side notification queue when polling is armed, and leaves queue
/// draining and dispatch to [`crate::CardSurface::tick`].
pub(crate) struct MainLoopPump {
    pump_repeats: u32,
    polling_armed: bool,
}

impl MainLoopPump {
    pub(crate) fn new(pump_repeats: u32) -> Self {
        Self {
            // Zero would starve the embedded control entirely.
            pump_repeats: pump_repeats.max(1),
            polling_armed: false,
        }
    }

    pub(crate) fn polling_armed(&self) -> bool {
        self.polling_armed
    }

    pub(crate) fn arm_polling(&mut self) {
        if !self.polling_armed {
            info!("card notification polling armed");
            self.polling_armed = true;
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.polling_armed = false;
    }

    /// Drive the module's message loop. One call per tick was observed to be
    /// insufficient to keep the embedded control rendering and responding to
    /// input, so the call is repeated `pump_repeats` times (a tunable, see
    /// [`crate::BridgeSettings::pump_repeats`]). A no-op on modules that do
    /// not export a pump entry point.
    pub(crate) fn pump_native(&self, module: &NativeModule) {
        if let Some(pump) = module.symbols.pump_messages {
            for _ in 0..self.pump_repeats {
                unsafe { pump() };
            }
        }
    }

    /// Move every pending module-side notification into the event queue.
    pub(crate) fn poll_native(&self, module: &NativeModule) {
        let poll = match module.symbols.poll_notification {
            Some(f) => f,
            None => return,
        };

        let mut type_buf = [0u8; NOTIFY_TYPE_BUF_LEN];
        let mut data_buf = [0u8; NOTIFY_DATA_BUF_LEN];
        loop {
            let pending = unsafe {
                poll(
                    type_buf.as_mut_ptr().cast::<c_char>(),
                    NOTIFY_TYPE_BUF_LEN as c_int,
                    data_buf.as_mut_ptr().cast::<c_char>(),
                    NOTIFY_DATA_BUF_LEN as c_int,
                )
            };
            if pending == 0 {
                break;
            }

            let kind = buffer_string(&type_buf);
            let data = buffer_string(&data_buf);
            match CardEvent::from_notification(&kind, &data) {
                Some(event) => events::enqueue(event),
                None => warn!("unrecognized card notification type: {:?}", kind),
            }

            type_buf.fill(0);
            data_buf.fill(0);
        }
    }
}

/// The NUL-terminated prefix of `buf` as an owned string.
fn buffer_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_native as mock;

    #[test]
    fn buffer_string_stops_at_nul() {
        assert_eq!(buffer_string(b"CardPaymentSuccess\0junk"), "CardPaymentSuccess");
        assert_eq!(buffer_string(b"no-terminator"), "no-terminator");
        assert_eq!(buffer_string(b"\0"), "");
    }

    #[test]
    fn pump_repeats_the_configured_number_of_times() {
        let _guard = mock::serialize();
        mock::reset();

        let module = mock::module_with(mock::full_table());
        MainLoopPump::new(5).pump_native(module);
        assert_eq!(mock::pump_calls(), 5);
    }

    #[test]
    fn pump_repeat_count_has_a_floor_of_one() {
        let _guard = mock::serialize();
        mock::reset();

        let module = mock::module_with(mock::full_table());
        MainLoopPump::new(0).pump_native(module);
        assert_eq!(mock::pump_calls(), 1);
    }

    #[test]
    fn polling_translates_and_enqueues_in_order() {
        let _guard = mock::serialize();
        mock::reset();

        mock::feed_notification("CardPurchaseProcessing", "");
        mock::feed_notification("CardOptinResponse", "email");
        mock::feed_notification("NotAThing", "ignored");

        let module = mock::module_with(mock::full_table());
        let mut pump = MainLoopPump::new(1);
        pump.arm_polling();
        pump.poll_native(module);

        assert_eq!(
            crate::events::drain_all(),
            vec![
                CardEvent::PurchaseProcessing,
                CardEvent::OptinResponse("email".into()),
            ]
        );
    }
}
