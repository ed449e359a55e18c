//! Picking our events out of the connection's event queue.

use crate::decode::RawEventKind;

/// `response_type` of X generic events (`GenericEvent` in xproto).
pub const GE_GENERIC_EVENT: u8 = 35;
/// High bit of `response_type`, set on events sent with `SendEvent`.
const SEND_EVENT_BIT: u8 = 0x80;
/// Offset of the 16-bit extension event type in a generic event.
const EVTYPE_OFFSET: usize = 8;

/// Accepts raw motion and raw button events belonging to one extension.
///
/// Generic events from all extensions share a `response_type`, so they are told apart by the
/// major opcode of the extension, found when querying for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventFilter {
    extension_opcode: u8,
}
impl EventFilter {
    #[must_use]
    pub const fn new(extension_opcode: u8) -> Self {
        Self { extension_opcode }
    }
    #[must_use]
    pub const fn extension_opcode(self) -> u8 {
        self.extension_opcode
    }
    /// Test an event in wire format. Only the header is looked at.
    #[must_use]
    pub fn accept(self, event: &[u8]) -> bool {
        self.kind_of(event).is_some()
    }
    /// Which of our event kinds this is, if any.
    #[must_use]
    pub fn kind_of(self, event: &[u8]) -> Option<RawEventKind> {
        let (&response_type, rest) = event.split_first()?;
        let &extension = rest.first()?;
        if response_type & !SEND_EVENT_BIT != GE_GENERIC_EVENT
            || extension != self.extension_opcode
        {
            return None;
        }
        let evtype = event.get(EVTYPE_OFFSET..EVTYPE_OFFSET + 2)?;
        // X is host byte order, but x11rb only speaks little endian.
        RawEventKind::from_code(u16::from_le_bytes([evtype[0], evtype[1]]))
    }
}
