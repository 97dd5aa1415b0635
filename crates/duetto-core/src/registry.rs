//! Parameter registry.
//!
//! Holds every host-visible parameter in a fixed index order together with the
//! logical groups ("units") the host uses to organize them. Indices are
//! assigned contiguously from 0 while the plugin is being initialized and are
//! never reused afterwards.
//!
//! Each parameter's normalized value is stored in an [`AtomicDouble`], so the
//! registry can be shared behind an `Arc` between the audio thread, the editor
//! and the host's persistence thread.

use crate::error::{Error, Result};
use crate::lockfree::AtomicDouble;
use crate::parameter::ParameterRange;
use serde::{Deserialize, Serialize};

/// Logical parameter group identifier.
///
/// Ids are handed out in order of first appearance and stay stable for the
/// lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub i32);

impl UnitId {
    /// The implicit root unit every parameter belongs to by default.
    pub const ROOT: UnitId = UnitId(0);
    /// Parent id reported for the root unit.
    pub const NO_PARENT: UnitId = UnitId(-1);
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit description as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub id: UnitId,
    pub parent_id: UnitId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterFlags {
    pub automatable: bool,
    pub read_only: bool,
    pub hidden: bool,
    /// The host's bypass switch. At most one parameter carries it.
    pub bypass: bool,
}

impl Default for ParameterFlags {
    fn default() -> Self {
        Self {
            automatable: true,
            read_only: false,
            hidden: false,
            bypass: false,
        }
    }
}

/// Static description of a parameter, supplied at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Display unit label ("dB", "Hz", ...).
    pub label: String,
    pub range: ParameterRange,
    /// Group shown to the host; empty means the root unit.
    pub group: String,
    pub flags: ParameterFlags,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, range: ParameterRange) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            range,
            group: String::new(),
            flags: ParameterFlags::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A registered parameter: descriptor, unit and live normalized value.
#[derive(Debug)]
pub struct Parameter {
    descriptor: ParameterDescriptor,
    unit_id: UnitId,
    normalized: AtomicDouble,
}

impl Parameter {
    fn new(descriptor: ParameterDescriptor, unit_id: UnitId) -> Self {
        let normalized = AtomicDouble::new(descriptor.range.default_normalized());
        Self {
            descriptor,
            unit_id,
            normalized,
        }
    }

    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn range(&self) -> &ParameterRange {
        &self.descriptor.range
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    #[inline]
    pub fn normalized(&self) -> f64 {
        self.normalized.get()
    }

    /// Store a normalized value, clamped to [0, 1] and snapped for stepped
    /// scales. Returns the value actually stored.
    #[inline]
    pub fn set_normalized(&self, value: f64) -> f64 {
        let value = self.descriptor.range.snap_normalized(value);
        self.normalized.set(value);
        value
    }

    /// Current value in real units.
    #[inline]
    pub fn value(&self) -> f64 {
        self.descriptor.range.denormalize(self.normalized())
    }

    /// Store a value given in real units. Returns the normalized value stored.
    #[inline]
    pub fn set_value(&self, value: f64) -> f64 {
        self.set_normalized(self.descriptor.range.normalize(value))
    }

    pub fn reset(&self) {
        self.normalized
            .set(self.descriptor.range.default_normalized());
    }
}

/// Ordered parameter collection plus unit table.
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    params: Vec<Parameter>,
    /// Unit names; unit id `n` lives at `units[n - 1]`.
    units: Vec<String>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the parameter at `index`.
    ///
    /// Indices must arrive contiguously from 0. A repeated index or a gap is a
    /// configuration error; the registry is left unchanged.
    pub fn register(&mut self, index: usize, descriptor: ParameterDescriptor) -> Result<()> {
        let expected = self.params.len();
        if index < expected {
            return Err(Error::DuplicateParameter(index));
        }
        if index > expected {
            return Err(Error::ParameterGap {
                expected,
                got: index,
            });
        }

        let unit_id = if descriptor.group.is_empty() {
            UnitId::ROOT
        } else {
            self.group_id_for_name(&descriptor.group)
        };

        tracing::trace!(index, name = %descriptor.name, unit = %unit_id, "registered parameter");
        self.params.push(Parameter::new(descriptor, unit_id));
        Ok(())
    }

    /// Append a parameter at the next free index and return that index.
    pub fn push(&mut self, descriptor: ParameterDescriptor) -> Result<usize> {
        let index = self.params.len();
        self.register(index, descriptor)?;
        Ok(index)
    }

    /// Unit id for `name`, allocating a new one on first sight.
    ///
    /// Matching is exact and case-sensitive.
    pub fn group_id_for_name(&mut self, name: &str) -> UnitId {
        if let Some(pos) = self.units.iter().position(|unit| unit == name) {
            return UnitId(pos as i32 + 1);
        }
        self.units.push(name.to_string());
        UnitId(self.units.len() as i32)
    }

    pub fn get(&self, index: usize) -> Result<&Parameter> {
        self.params.get(index).ok_or(Error::ParameterOutOfRange {
            index,
            count: self.params.len(),
        })
    }

    pub fn normalized_to_real(&self, index: usize, normalized: f64) -> Result<f64> {
        Ok(self.get(index)?.range().denormalize(normalized))
    }

    pub fn real_to_normalized(&self, index: usize, value: f64) -> Result<f64> {
        Ok(self.get(index)?.range().normalize(value))
    }

    /// Store a normalized value; returns the value actually stored.
    pub fn set_normalized(&self, index: usize, normalized: f64) -> Result<f64> {
        Ok(self.get(index)?.set_normalized(normalized))
    }

    pub fn normalized(&self, index: usize) -> Result<f64> {
        Ok(self.get(index)?.normalized())
    }

    /// Index of the parameter flagged as the host bypass, if any.
    pub fn bypass_index(&self) -> Option<usize> {
        self.params
            .iter()
            .position(|param| param.descriptor.flags.bypass)
    }

    pub fn reset_to_defaults(&self) {
        for param in &self.params {
            param.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Number of units including the root unit.
    pub fn unit_count(&self) -> usize {
        self.units.len() + 1
    }

    /// Unit at `unit_index` (0 is the root unit).
    pub fn unit_info(&self, unit_index: usize) -> Option<UnitInfo> {
        if unit_index == 0 {
            return Some(UnitInfo {
                id: UnitId::ROOT,
                parent_id: UnitId::NO_PARENT,
                name: "Root Unit".to_string(),
            });
        }
        self.units.get(unit_index - 1).map(|name| UnitInfo {
            id: UnitId(unit_index as i32),
            parent_id: UnitId::ROOT,
            name: name.clone(),
        })
    }
}
