//! Lazily discovered input devices.
//!
//! Raw events name the physical device they came from, which may never have been seen before.
//! The first event from a device triggers a query for its description, after which it keeps a
//! stable, dense index for the rest of the driver's life.

use smallvec::SmallVec;

use crate::decode::DecodeError;

/// The server-assigned ID of an input device. IDs of unplugged devices may be reused by the server.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceId(pub u16);
impl DeviceId {
    /// Wildcard matching every master device, for event selection and warping.
    pub const ALL_MASTER: DeviceId = DeviceId(1);
}
impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValuatorMode {
    /// Reports deltas, e.g. mouse motion.
    Relative,
    /// Reports positions within `[min, max]`, e.g. tablet styluses.
    Absolute,
}

/// Description of one axis of a device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValuatorClass {
    /// The axis index, which is also the valuator's bit in event presence masks.
    pub number: u16,
    pub mode: ValuatorMode,
    pub min: f64,
    pub max: f64,
}

/// One capability of a device, as listed by the server. Only valuators are interpreted;
/// the rest are kept so the list mirrors the server's.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassEntry {
    Key,
    Button { count: u16 },
    Valuator(ValuatorClass),
    Scroll,
    Touch,
    /// Known to the protocol but of no interest to us.
    Other,
    /// The server sent a class we couldn't make sense of.
    Malformed,
}
impl ClassEntry {
    #[must_use]
    pub fn as_valuator(&self) -> Option<&ValuatorClass> {
        match self {
            Self::Valuator(v) => Some(v),
            _ => None,
        }
    }
}

/// Everything we remember about a device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRecord {
    pub id: DeviceId,
    /// Human readable, lossily converted to UTF8.
    pub name: String,
    pub enabled: bool,
    /// In the order reported by the server.
    pub classes: SmallVec<[ClassEntry; 8]>,
}

impl DeviceRecord {
    /// Diagnostics for every class the server sent that couldn't be understood.
    pub fn malformed_classes(&self) -> impl Iterator<Item = DecodeError> + '_ {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| matches!(class, ClassEntry::Malformed))
            .map(|(position, _)| DecodeError::MalformedClassEntry {
                device: self.id,
                position,
            })
    }
}

/// The description of a device could not be fetched.
#[derive(thiserror::Error, Debug)]
#[error("failed to query device {device}")]
pub struct DeviceQueryFailed {
    pub device: DeviceId,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Maps device IDs to dense indices, in first-seen order. Never shrinks.
#[derive(Default)]
pub struct DeviceRegistry {
    records: Vec<DeviceRecord>,
    indices: std::collections::HashMap<DeviceId, usize>,
}
impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Find the index of `device`, querying and registering it if this is the first sighting.
    ///
    /// `query` is only called for unknown devices. If it fails, nothing is registered and the
    /// next call for the same device will query again.
    /// Returns the index and whether it was newly created.
    pub fn resolve(
        &mut self,
        device: DeviceId,
        query: impl FnOnce(DeviceId) -> Result<DeviceRecord, DeviceQueryFailed>,
    ) -> Result<(usize, bool), DeviceQueryFailed> {
        if let Some(&index) = self.indices.get(&device) {
            return Ok((index, false));
        }

        let mut record = query(device)?;
        // Trust the id we asked for over the one the reply carries.
        record.id = device;

        let index = self.records.len();
        log::debug!(
            "discovered device {device} {:?} at index {index} ({} classes)",
            record.name,
            record.classes.len()
        );
        for malformed in record.malformed_classes() {
            log::warn!("{malformed}, skipping it");
        }
        self.records.push(record);
        self.indices.insert(device, index);
        Ok((index, true))
    }
    #[must_use]
    pub fn index_of(&self, device: DeviceId) -> Option<usize> {
        self.indices.get(&device).copied()
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DeviceRecord> {
        self.records.get(index)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Records in index order.
    #[must_use]
    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }
}
