//! A scripted, in-memory display connection.

use std::collections::{HashMap, VecDeque};

use super::{Connection, Window};
use crate::decode::RawEventPayload;
use crate::filter::{tests::header, EventFilter, GE_GENERIC_EVENT};
use crate::registry::{ClassEntry, DeviceId, DeviceRecord, ValuatorClass, ValuatorMode};

pub(crate) const ROOT: Window = 0x1E1;
pub(crate) const OPCODE: u8 = 131;

#[derive(thiserror::Error, Debug)]
#[error("mock connection is broken")]
pub(crate) struct MockError;

/// A plain relative mouse.
pub(crate) fn mouse(id: u16) -> DeviceRecord {
    let axis = |number| {
        ClassEntry::Valuator(ValuatorClass {
            number,
            mode: ValuatorMode::Relative,
            min: 0.0,
            max: 0.0,
        })
    };
    DeviceRecord {
        id: DeviceId(id),
        name: format!("mock mouse {id}"),
        enabled: true,
        classes: [ClassEntry::Button { count: 7 }, axis(0), axis(1)]
            .into_iter()
            .collect(),
    }
}

/// Events carry their wire header for the filter to look at, and the payload it stands for.
/// Foreign events have no payload.
type Queued = (Vec<u8>, Option<RawEventPayload>);

pub(crate) struct MockConnection {
    /// `None` to pretend XInput is missing.
    pub opcode: Option<u8>,
    /// Every request fails while set.
    pub broken: bool,
    /// Refuse raw event selection on windows other than the root, like a real server.
    pub root_only_raw_events: bool,
    /// Refuse raw event selection on the root too.
    pub reject_root_selection: bool,
    /// Fail this many device queries before succeeding.
    pub failing_queries: usize,
    pub devices: HashMap<DeviceId, DeviceRecord>,
    queue: VecDeque<Queued>,
    // Request logs.
    pub selected: Vec<(Window, DeviceId)>,
    pub queries: Vec<DeviceId>,
    pub warps: Vec<(DeviceId, Window, i32, i32)>,
    pub syncs: usize,
}
impl MockConnection {
    pub(crate) fn new() -> Self {
        Self {
            opcode: Some(OPCODE),
            broken: false,
            root_only_raw_events: false,
            reject_root_selection: false,
            failing_queries: 0,
            devices: HashMap::new(),
            queue: VecDeque::new(),
            selected: Vec::new(),
            queries: Vec::new(),
            warps: Vec::new(),
            syncs: 0,
        }
    }
    pub(crate) fn add_device(&mut self, record: DeviceRecord) {
        self.devices.insert(record.id, record);
    }
    /// Queue a raw event from the XInput extension.
    pub(crate) fn push(&mut self, payload: RawEventPayload) {
        let header = header(GE_GENERIC_EVENT, OPCODE, payload.kind.code());
        self.queue.push_back((header, Some(payload)));
    }
    /// Queue a core event of the given type.
    pub(crate) fn push_foreign(&mut self, response_type: u8) {
        self.queue.push_back((header(response_type, OPCODE, 0), None));
    }
    pub(crate) fn foreign_remaining(&self) -> usize {
        self.queue.iter().filter(|(_, payload)| payload.is_none()).count()
    }
    fn check(&self) -> Result<(), MockError> {
        if self.broken {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

impl Connection for MockConnection {
    type Error = MockError;

    fn query_extension(&mut self) -> Result<Option<u8>, MockError> {
        self.check()?;
        Ok(self.opcode)
    }
    fn root_window(&self) -> Window {
        ROOT
    }
    fn select_raw_events(&mut self, window: Window, device: DeviceId) -> Result<(), MockError> {
        self.check()?;
        let rejected = if window == ROOT {
            self.reject_root_selection
        } else {
            self.root_only_raw_events
        };
        if rejected {
            return Err(MockError);
        }
        self.selected.push((window, device));
        Ok(())
    }
    fn check_if_event(
        &mut self,
        filter: EventFilter,
    ) -> Result<Option<RawEventPayload>, MockError> {
        self.check()?;
        let Some(position) = self.queue.iter().position(|(header, _)| filter.accept(header))
        else {
            return Ok(None);
        };
        Ok(self.queue.remove(position).and_then(|(_, payload)| payload))
    }
    fn query_device(&mut self, device: DeviceId) -> Result<DeviceRecord, MockError> {
        self.check()?;
        self.queries.push(device);
        if self.failing_queries > 0 {
            self.failing_queries -= 1;
            return Err(MockError);
        }
        self.devices.get(&device).cloned().ok_or(MockError)
    }
    fn warp_pointer(
        &mut self,
        device: DeviceId,
        window: Window,
        x: i32,
        y: i32,
    ) -> Result<(), MockError> {
        self.check()?;
        self.warps.push((device, window, x, y));
        Ok(())
    }
    fn sync(&mut self) -> Result<(), MockError> {
        self.check()?;
        self.syncs += 1;
        Ok(())
    }
}
