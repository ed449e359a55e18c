//! The polling driver, generic over the display connection.
//!
//! The X server pushes raw events at us, but users of this crate want to *ask* what the mouse
//! is doing. Every query first drains whatever raw events are already queued, then answers from
//! the accumulated state. Nothing here ever waits for new events.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::aggregate::Aggregator;
use crate::decode::decode;
use crate::filter::EventFilter;
use crate::platform::{Connection, Window};
use crate::registry::{DeviceId, DeviceQueryFailed, DeviceRecord, DeviceRegistry};
use crate::state::MouseState;
use crate::util::round_saturating;

/// Errors that may occur while starting a [`Driver`].
#[derive(thiserror::Error, Debug)]
pub enum InitError<E: std::error::Error + 'static> {
    /// The server lacks XInput 2.
    #[error("XInput 2 is not supported by the server")]
    Unsupported,
    #[error("connection failed during setup")]
    Connection(#[source] E),
}

/// Raw mouse state for every device on a connection, polled on demand.
///
/// Not meant for concurrent use, every operation mutates the cached state.
pub struct Driver<C: Connection> {
    display: Arc<Mutex<C>>,
    root: Window,
    filter: EventFilter,
    registry: DeviceRegistry,
    aggregator: Aggregator,
}

impl<C: Connection> Driver<C> {
    /// Whether the server behind `display` can back a driver.
    /// Connection failures count as "no".
    pub fn is_supported(display: &Mutex<C>) -> bool {
        match display.lock().query_extension() {
            Ok(opcode) => opcode.is_some(),
            Err(err) => {
                log::debug!("couldn't query for XInput: {err}");
                false
            }
        }
    }
    /// Start listening for raw events.
    ///
    /// Raw events are only ever delivered through the root window, so that is where they're
    /// selected, and failing to do so is an error. Selection on `window`, if given and distinct
    /// from the root, is attempted too but allowed to fail.
    ///
    /// The lock on `display` is only held during calls into the driver.
    #[allow(clippy::missing_errors_doc)]
    pub fn new(
        display: Arc<Mutex<C>>,
        window: Option<Window>,
    ) -> Result<Self, InitError<C::Error>> {
        let (opcode, root) = {
            let mut conn = display.lock();
            let opcode = conn
                .query_extension()
                .map_err(InitError::Connection)?
                .ok_or(InitError::Unsupported)?;
            let root = conn.root_window();

            conn.select_raw_events(root, DeviceId::ALL_MASTER)
                .map_err(InitError::Connection)?;
            // Servers reject raw selection on anything with a parent.
            if let Some(window) = window.filter(|&window| window != root) {
                if let Err(err) = conn.select_raw_events(window, DeviceId::ALL_MASTER) {
                    log::warn!("raw events not selectable on window {window:#x}: {err}");
                }
            }
            (opcode, root)
        };
        log::debug!("listening for raw events, XInput opcode {opcode}");

        Ok(Self {
            display,
            root,
            filter: EventFilter::new(opcode),
            registry: DeviceRegistry::new(),
            aggregator: Aggregator::new(),
        })
    }
    /// The shared connection this driver talks through.
    #[must_use]
    pub fn display(&self) -> &Arc<Mutex<C>> {
        &self.display
    }
    /// State of all devices combined. Buttons are unioned, wheels summed, and the position is
    /// that of the device that moved last.
    pub fn poll_master(&mut self) -> MouseState {
        self.drain();
        self.aggregator.merge()
    }
    /// State of the `index`th device discovered, or a default, disconnected state if there is
    /// no such device.
    pub fn poll_device(&mut self, index: usize) -> MouseState {
        self.drain();
        self.aggregator.get(index).copied().unwrap_or_default()
    }
    /// Warp the cursor of every master pointer to `(x, y)` in root window coordinates.
    ///
    /// This moves the real, on-screen cursor! Afterwards, every device (and the master) reports
    /// the new position. If the warp fails, nothing is changed.
    pub fn set_position(&mut self, x: f64, y: f64) {
        let (x, y) = (round_saturating(x), round_saturating(y));
        {
            let mut conn = self.display.lock();
            let warped = conn
                .warp_pointer(DeviceId::ALL_MASTER, self.root, x, y)
                .and_then(|()| conn.sync());
            if let Err(err) = warped {
                log::warn!("failed to warp pointer to ({x}, {y}): {err}");
                return;
            }
        }
        // Catch up on anything that arrived before the warp, then pin everyone to the target.
        self.drain();
        self.aggregator.set_position(x, y);
    }
    /// Devices discovered so far, in index order.
    #[must_use]
    pub fn devices(&self) -> &[DeviceRecord] {
        self.registry.records()
    }
    /// Process every queued event.
    fn drain(&mut self) {
        loop {
            let mut conn = self.display.lock();
            let payload = match conn.check_if_event(self.filter) {
                Ok(Some(payload)) => payload,
                Ok(None) => break,
                Err(err) => {
                    log::warn!("stopped draining events: {err}");
                    break;
                }
            };
            log::trace!("{:?} from device {}", payload.kind, payload.device);

            let resolved = self.registry.resolve(payload.device, |device| {
                conn.query_device(device).map_err(|err| DeviceQueryFailed {
                    device,
                    source: Some(Box::new(err)),
                })
            });
            drop(conn);

            let index = match resolved {
                Ok((index, false)) => index,
                Ok((index, true)) => {
                    let enabled = self.registry.get(index).is_some_and(|record| record.enabled);
                    let pushed = self.aggregator.push(enabled);
                    debug_assert_eq!(pushed, index, "registry and aggregator out of step");
                    index
                }
                Err(err) => {
                    // Retried on the next event from this device.
                    log::warn!("dropping event: {err}");
                    continue;
                }
            };
            let Some(record) = self.registry.get(index) else {
                continue;
            };
            let update = decode(&payload, record);
            self.aggregator.apply(index, update);
        }
    }
}
