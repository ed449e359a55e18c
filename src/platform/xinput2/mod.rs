use std::collections::VecDeque;

use x11rb::{
    connection::{Connection as _, RequestConnection as _},
    errors::ParseError,
    protocol::{
        xinput::{self, ConnectionExt as _},
        xproto::{self, ConnectionExt as _},
    },
    rust_connection::RustConnection,
    x11_utils::TryParse,
};

use super::{Connection, Window};
use crate::decode::{RawEventKind, RawEventPayload};
use crate::filter::EventFilter;
use crate::registry::{ClassEntry, DeviceId, DeviceRecord, ValuatorClass, ValuatorMode};

/// Lowest protocol version that has raw events.
const XI_MAJOR: u16 = 2;
const XI_MINOR: u16 = 0;
/// Unmatched events kept for the collaborator before the oldest start being dropped.
const MAX_UNMATCHED: usize = 1024;

pub type Manager = crate::driver::Driver<X11Connection>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to connect to the X server")]
    Connect(#[from] x11rb::errors::ConnectError),
    #[error(transparent)]
    Connection(#[from] x11rb::errors::ConnectionError),
    #[error(transparent)]
    Reply(#[from] x11rb::errors::ReplyError),
    #[error("the X server has no screen {0}")]
    NoScreen(usize),
    #[error("the X server doesn't know device {0}")]
    NoSuchDevice(DeviceId),
}

fn fixed32_to_f64(fixed: &xinput::Fp3232) -> f64 {
    // Two's complement, the fraction always counts up from `integral`.
    f64::from(fixed.integral) + f64::from(fixed.frac) / (u64::from(u32::MAX) + 1) as f64
}
/// Whole pixels to 16.16, clamped to what fits.
fn to_fixed16(value: i32) -> xinput::Fp1616 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) << 16
}

fn class_entry(data: &xinput::DeviceClassData) -> ClassEntry {
    match data {
        xinput::DeviceClassData::Key(_) => ClassEntry::Key,
        xinput::DeviceClassData::Button(b) => ClassEntry::Button {
            count: b.num_buttons(),
        },
        xinput::DeviceClassData::Valuator(v) => ClassEntry::Valuator(ValuatorClass {
            number: v.number,
            mode: if v.mode == xinput::ValuatorMode::RELATIVE {
                ValuatorMode::Relative
            } else {
                ValuatorMode::Absolute
            },
            min: fixed32_to_f64(&v.min),
            max: fixed32_to_f64(&v.max),
        }),
        xinput::DeviceClassData::Scroll(_) => ClassEntry::Scroll,
        xinput::DeviceClassData::Touch(_) => ClassEntry::Touch,
        xinput::DeviceClassData::InvalidValue(_) => ClassEntry::Malformed,
        _ => ClassEntry::Other,
    }
}

/// Copy a raw event out of wire format. All three raw types share one layout.
fn parse_raw(
    kind: RawEventKind,
    event: &[u8],
    unaccelerated: bool,
) -> Result<RawEventPayload, ParseError> {
    let (raw, _) = xinput::RawButtonPressEvent::try_parse(event)?;
    let device = DeviceId(raw.deviceid);
    Ok(match kind {
        RawEventKind::ButtonPress => RawEventPayload::button(device, raw.detail, true),
        RawEventKind::ButtonRelease => RawEventPayload::button(device, raw.detail, false),
        RawEventKind::Motion => {
            let values = if unaccelerated {
                &raw.axisvalues_raw
            } else {
                &raw.axisvalues
            };
            // Words of the mask are little endian bytes, so bit numbering carries over.
            let mask = raw
                .valuator_mask
                .iter()
                .flat_map(|word| word.to_le_bytes())
                .collect();
            RawEventPayload::motion(device, mask, values.iter().map(fixed32_to_f64))
        }
    })
}

/// Keep a foreign event, dropping the oldest if nobody has been collecting them.
fn stash_unmatched(unmatched: &mut VecDeque<Vec<u8>>, event: Vec<u8>) {
    if unmatched.len() >= MAX_UNMATCHED {
        let excess = unmatched.len() + 1 - MAX_UNMATCHED;
        unmatched.drain(..excess);
        log::warn!("unmatched events aren't being taken, dropped {excess}");
    }
    unmatched.push_back(event);
}

/// A connection to an X server, for use by the driver.
///
/// The driver takes events from this connection's queue. Anything else it comes across on the
/// way is kept, in order, for [`X11Connection::take_unmatched`]. Only the most recent
/// thousand or so are kept, so take them regularly.
pub struct X11Connection {
    conn: RustConnection,
    root: xproto::Window,
    unaccelerated: bool,
    unmatched: VecDeque<Vec<u8>>,
}
impl X11Connection {
    /// Connect to `display_name`, or `$DISPLAY` if `None`.
    ///
    /// With `unaccelerated`, motion is reported as the device sent it rather than after
    /// pointer acceleration.
    #[allow(clippy::missing_errors_doc)]
    pub fn connect(display_name: Option<&str>, unaccelerated: bool) -> Result<Self, Error> {
        let (conn, screen) = x11rb::connect(display_name)?;
        let root = conn
            .setup()
            .roots
            .get(screen)
            .ok_or(Error::NoScreen(screen))?
            .root;
        Ok(Self {
            conn,
            root,
            unaccelerated,
            unmatched: VecDeque::new(),
        })
    }
    #[must_use]
    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }
    /// Events in wire format that were read from the connection but aren't ours, oldest first.
    pub fn take_unmatched(&mut self) -> VecDeque<Vec<u8>> {
        std::mem::take(&mut self.unmatched)
    }
}

impl Connection for X11Connection {
    type Error = Error;

    fn query_extension(&mut self) -> Result<Option<u8>, Error> {
        // Check we have XInput2 and get it's version.
        let Some(info) = self
            .conn
            .extension_information(xinput::X11_EXTENSION_NAME)?
        else {
            log::debug!("server lacks XInput");
            return Ok(None);
        };
        let version = self
            .conn
            .xinput_xi_query_version(XI_MAJOR, XI_MINOR)?
            .reply()?;
        log::debug!(
            "server supports XInput v{}.{}",
            version.major_version,
            version.minor_version
        );

        Ok((version.major_version >= XI_MAJOR).then_some(info.major_opcode))
    }
    fn root_window(&self) -> Window {
        self.root
    }
    fn select_raw_events(&mut self, window: Window, device: DeviceId) -> Result<(), Error> {
        let interest = xinput::EventMask {
            deviceid: device.0,
            mask: [xinput::XIEventMask::RAW_MOTION
                | xinput::XIEventMask::RAW_BUTTON_PRESS
                | xinput::XIEventMask::RAW_BUTTON_RELEASE]
            .into(),
        };
        self.conn
            .xinput_xi_select_events(window, std::slice::from_ref(&interest))?
            .check()?;
        Ok(())
    }
    fn check_if_event(&mut self, filter: EventFilter) -> Result<Option<RawEventPayload>, Error> {
        while let Some(event) = self.conn.poll_for_raw_event()? {
            let Some(kind) = filter.kind_of(&event) else {
                stash_unmatched(&mut self.unmatched, event);
                continue;
            };
            match parse_raw(kind, &event, self.unaccelerated) {
                Ok(payload) => return Ok(Some(payload)),
                Err(err) => log::warn!("skipping unparsable raw event: {err}"),
            }
        }
        Ok(None)
    }
    fn query_device(&mut self, device: DeviceId) -> Result<DeviceRecord, Error> {
        let info = self
            .conn
            .xinput_xi_query_device(device.0)?
            .reply()?
            .infos
            .into_iter()
            .find(|info| info.deviceid == device.0)
            .ok_or(Error::NoSuchDevice(device))?;

        Ok(DeviceRecord {
            id: device,
            name: String::from_utf8_lossy(&info.name).into_owned(),
            enabled: info.enabled,
            classes: info
                .classes
                .iter()
                .map(|class| class_entry(&class.data))
                .collect(),
        })
    }
    fn warp_pointer(
        &mut self,
        device: DeviceId,
        window: Window,
        x: i32,
        y: i32,
    ) -> Result<(), Error> {
        self.conn
            .xinput_xi_warp_pointer(
                x11rb::NONE,
                window,
                0,
                0,
                0,
                0,
                to_fixed16(x),
                to_fixed16(y),
                device.0,
            )?
            .check()?;
        Ok(())
    }
    fn sync(&mut self) -> Result<(), Error> {
        // Any reply will do.
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }
}
