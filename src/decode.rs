//! Turning raw XInput2 events into state changes.

use crate::registry::{ClassEntry, DeviceId, DeviceRecord, ValuatorMode};
use crate::state::{MouseButton, WheelDirection};
use crate::util::{count_set_below, is_bit_set};

/// Size of each entry of [`RawEventPayload::values`].
const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Problems with individual events. These never stop a drain, they're logged and the offending
/// piece of data is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid bit offset {bit} in a {mask_len} byte mask")]
    InvalidBitOffset { bit: i32, mask_len: usize },
    #[error("device {device} has a malformed class at position {position}")]
    MalformedClassEntry { device: DeviceId, position: usize },
    #[error("device {device} flagged valuator {axis} but carried no value for it")]
    MissingValue { device: DeviceId, axis: u16 },
}

/// The three raw event types we listen for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEventKind {
    ButtonPress,
    ButtonRelease,
    Motion,
}
impl RawEventKind {
    /// XI2 event type codes, as found in the generic event header.
    pub const BUTTON_PRESS_CODE: u16 = 15;
    pub const BUTTON_RELEASE_CODE: u16 = 16;
    pub const MOTION_CODE: u16 = 17;

    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            Self::BUTTON_PRESS_CODE => Some(Self::ButtonPress),
            Self::BUTTON_RELEASE_CODE => Some(Self::ButtonRelease),
            Self::MOTION_CODE => Some(Self::Motion),
            _ => None,
        }
    }
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::ButtonPress => Self::BUTTON_PRESS_CODE,
            Self::ButtonRelease => Self::BUTTON_RELEASE_CODE,
            Self::Motion => Self::MOTION_CODE,
        }
    }
}

/// A raw event, copied out of the event queue.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEventPayload {
    pub device: DeviceId,
    pub kind: RawEventKind,
    /// Button number for button events, unused for motion.
    pub detail: u32,
    /// Which valuators carry a value in this event, LSB-first.
    pub mask: Vec<u8>,
    /// One little-endian `f64` per set bit of `mask`, in ascending bit order.
    pub values: Vec<u8>,
}
impl RawEventPayload {
    #[must_use]
    pub fn button(device: DeviceId, detail: u32, pressed: bool) -> Self {
        Self {
            device,
            kind: if pressed {
                RawEventKind::ButtonPress
            } else {
                RawEventKind::ButtonRelease
            },
            detail,
            mask: Vec::new(),
            values: Vec::new(),
        }
    }
    /// A motion event, with `values` being the values of the set bits of `mask`, in order.
    #[must_use]
    pub fn motion(device: DeviceId, mask: Vec<u8>, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            device,
            kind: RawEventKind::Motion,
            detail: 0,
            mask,
            values: pack_values(values),
        }
    }
    /// Read the `index`th packed value, if present.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<f64> {
        let start = index.checked_mul(VALUE_SIZE)?;
        let end = start.checked_add(VALUE_SIZE)?;
        let bytes: [u8; VALUE_SIZE] = self.values.get(start..end)?.try_into().ok()?;
        Some(f64::from_le_bytes(bytes))
    }
}

/// Pack values into the little-endian layout of [`RawEventPayload::values`].
pub fn pack_values(values: impl IntoIterator<Item = f64>) -> Vec<u8> {
    values.into_iter().flat_map(f64::to_le_bytes).collect()
}

/// The effect of a single raw event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecodedUpdate {
    Button { button: MouseButton, pressed: bool },
    Wheel(WheelDirection),
    /// Relative motion, in unrounded device units.
    Motion { dx: f64, dy: f64 },
    Ignored,
}

/// Auxiliary buttons, starting at X button 6.
const AUX_BUTTONS: [MouseButton; 9] = [
    MouseButton::Button1,
    MouseButton::Button2,
    MouseButton::Button3,
    MouseButton::Button4,
    MouseButton::Button5,
    MouseButton::Button6,
    MouseButton::Button7,
    MouseButton::Button8,
    MouseButton::Button9,
];

/// Decode an event from the device described by `record`.
#[must_use]
pub fn decode(payload: &RawEventPayload, record: &DeviceRecord) -> DecodedUpdate {
    match payload.kind {
        RawEventKind::ButtonPress => decode_button(payload.detail, true),
        RawEventKind::ButtonRelease => decode_button(payload.detail, false),
        RawEventKind::Motion => decode_motion(payload, record),
    }
}

fn decode_button(detail: u32, pressed: bool) -> DecodedUpdate {
    let button = match detail {
        1 => MouseButton::Left,
        2 => MouseButton::Middle,
        3 => MouseButton::Right,
        // Scroll "buttons". There's no such thing as un-scrolling, so releases are dropped.
        4 if pressed => return DecodedUpdate::Wheel(WheelDirection::Up),
        5 if pressed => return DecodedUpdate::Wheel(WheelDirection::Down),
        // Range checked, always in bounds.
        6..=14 => AUX_BUTTONS[(detail - 6) as usize],
        _ => return DecodedUpdate::Ignored,
    };
    DecodedUpdate::Button { button, pressed }
}

fn decode_motion(payload: &RawEventPayload, record: &DeviceRecord) -> DecodedUpdate {
    // [x, y]
    let mut delta = [None::<f64>; 2];

    // Malformed classes were reported at discovery.
    for valuator in record.classes.iter().filter_map(ClassEntry::as_valuator) {

        if !is_bit_set(&payload.mask, i32::from(valuator.number)) {
            continue;
        }
        // Axes are identified by number alone. Relative X and Y are conventionally 0 and 1.
        // Others (absolute, or scroll valuators) are unused for now.
        let slot = match (valuator.number, valuator.mode) {
            (0, ValuatorMode::Relative) => &mut delta[0],
            (1, ValuatorMode::Relative) => &mut delta[1],
            _ => continue,
        };

        // Values are packed, there are none for unset bits.
        let index = count_set_below(&payload.mask, u32::from(valuator.number));
        match payload.value(index) {
            Some(value) => *slot = Some(value),
            None => log::warn!(
                "{}",
                DecodeError::MissingValue {
                    device: record.id,
                    axis: valuator.number,
                }
            ),
        }
    }

    match delta {
        [None, None] => DecodedUpdate::Ignored,
        [dx, dy] => DecodedUpdate::Motion {
            dx: dx.unwrap_or_default(),
            dy: dy.unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, DecodedUpdate, RawEventPayload};
    use crate::registry::{ClassEntry, DeviceId, DeviceRecord, ValuatorClass, ValuatorMode};
    use crate::state::{MouseButton, WheelDirection};

    const ID: DeviceId = DeviceId(11);

    fn valuator(number: u16, mode: ValuatorMode) -> ClassEntry {
        ClassEntry::Valuator(ValuatorClass {
            number,
            mode,
            min: 0.0,
            max: 0.0,
        })
    }
    fn mouse(classes: impl IntoIterator<Item = ClassEntry>) -> DeviceRecord {
        DeviceRecord {
            id: ID,
            name: "test mouse".to_owned(),
            enabled: true,
            classes: classes.into_iter().collect(),
        }
    }
    /// A typical relative mouse, with a scroll valuator at 2.
    fn typical() -> DeviceRecord {
        mouse([
            ClassEntry::Button { count: 9 },
            valuator(0, ValuatorMode::Relative),
            valuator(1, ValuatorMode::Relative),
            valuator(2, ValuatorMode::Relative),
            ClassEntry::Scroll,
        ])
    }

    #[test]
    fn button_table() {
        let record = typical();
        let press = |detail| decode(&RawEventPayload::button(ID, detail, true), &record);
        let release = |detail| decode(&RawEventPayload::button(ID, detail, false), &record);

        assert_eq!(
            press(1),
            DecodedUpdate::Button {
                button: MouseButton::Left,
                pressed: true
            }
        );
        assert_eq!(
            release(2),
            DecodedUpdate::Button {
                button: MouseButton::Middle,
                pressed: false
            }
        );
        assert_eq!(
            press(3),
            DecodedUpdate::Button {
                button: MouseButton::Right,
                pressed: true
            }
        );
        assert_eq!(press(4), DecodedUpdate::Wheel(WheelDirection::Up));
        assert_eq!(press(5), DecodedUpdate::Wheel(WheelDirection::Down));
        assert_eq!(release(4), DecodedUpdate::Ignored);
        assert_eq!(release(5), DecodedUpdate::Ignored);
        assert_eq!(
            press(6),
            DecodedUpdate::Button {
                button: MouseButton::Button1,
                pressed: true
            }
        );
        assert_eq!(
            release(14),
            DecodedUpdate::Button {
                button: MouseButton::Button9,
                pressed: false
            }
        );
        assert_eq!(press(0), DecodedUpdate::Ignored);
        assert_eq!(press(15), DecodedUpdate::Ignored);
        assert_eq!(release(u32::MAX), DecodedUpdate::Ignored);
    }

    #[test]
    fn both_axes() {
        let event = RawEventPayload::motion(ID, vec![0b011], [3.7, -1.2]);
        assert_eq!(
            decode(&event, &typical()),
            DecodedUpdate::Motion { dx: 3.7, dy: -1.2 }
        );
    }

    #[test]
    fn y_alone_reads_the_first_value() {
        // Only bit 1 set, so Y's value is the first packed value.
        let event = RawEventPayload::motion(ID, vec![0b010], [-5.0]);
        assert_eq!(
            decode(&event, &typical()),
            DecodedUpdate::Motion { dx: 0.0, dy: -5.0 }
        );
    }

    #[test]
    fn skips_unused_axes() {
        // Scroll valuator 2 present alone.
        let event = RawEventPayload::motion(ID, vec![0b100], [120.0]);
        assert_eq!(decode(&event, &typical()), DecodedUpdate::Ignored);
        // And alongside X.
        let event = RawEventPayload::motion(ID, vec![0b101], [2.0, 120.0]);
        assert_eq!(
            decode(&event, &typical()),
            DecodedUpdate::Motion { dx: 2.0, dy: 0.0 }
        );
    }

    #[test]
    fn offsets_count_lower_set_bits() {
        // Absolute Y still occupies a packed value.
        let record = mouse([
            valuator(0, ValuatorMode::Relative),
            valuator(1, ValuatorMode::Absolute),
        ]);
        let event = RawEventPayload::motion(ID, vec![0b11], [1.5, 900.0]);
        assert_eq!(
            decode(&event, &record),
            DecodedUpdate::Motion { dx: 1.5, dy: 0.0 }
        );

        // Valuator list order needn't match axis order.
        let record = mouse([
            valuator(1, ValuatorMode::Relative),
            ClassEntry::Key,
            valuator(0, ValuatorMode::Relative),
        ]);
        let event = RawEventPayload::motion(ID, vec![0b11], [4.0, 8.0]);
        assert_eq!(
            decode(&event, &record),
            DecodedUpdate::Motion { dx: 4.0, dy: 8.0 }
        );
    }

    #[test]
    fn tolerates_bad_data() {
        let record = mouse([
            ClassEntry::Malformed,
            valuator(0, ValuatorMode::Relative),
            valuator(1, ValuatorMode::Relative),
        ]);
        // Y flagged, but the buffer only has room for X.
        let event = RawEventPayload::motion(ID, vec![0b11], [6.0]);
        assert_eq!(
            decode(&event, &record),
            DecodedUpdate::Motion { dx: 6.0, dy: 0.0 }
        );
        // Empty mask.
        let event = RawEventPayload::motion(ID, vec![], []);
        assert_eq!(decode(&event, &record), DecodedUpdate::Ignored);
    }

    #[test]
    fn no_valuators_no_motion() {
        let event = RawEventPayload::motion(ID, vec![0b11], [1.0, 1.0]);
        assert_eq!(
            decode(&event, &mouse([ClassEntry::Key])),
            DecodedUpdate::Ignored
        );
    }
}
