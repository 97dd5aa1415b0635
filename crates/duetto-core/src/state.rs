//! Persisted plugin state.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! "DUET" | version: u16 | reserved: u16 | count: u32 | count x f64 | trailer_len: u32 | trailer
//! ```
//!
//! Values are normalized and stored in registry index order. The trailer is
//! opaque plugin data. Decoding validates the whole blob before anything is
//! written back, so a failed load leaves the registry untouched.

use crate::error::StateError;
use crate::registry::ParameterRegistry;

pub const STATE_MAGIC: [u8; 4] = *b"DUET";
pub const STATE_VERSION: u16 = 1;

/// Bytes before the first parameter value.
pub const STATE_HEADER_SIZE: usize = 12;

const VALUE_SIZE: usize = 8;
const TRAILER_LEN_SIZE: usize = 4;

/// Serialized size of a state with `params` values and a `trailer_len` byte trailer.
pub fn state_size(params: usize, trailer_len: usize) -> usize {
    STATE_HEADER_SIZE + params * VALUE_SIZE + TRAILER_LEN_SIZE + trailer_len
}

/// Append the registry's current values and `trailer` to `out`.
pub fn write_state(registry: &ParameterRegistry, trailer: &[u8], out: &mut Vec<u8>) {
    out.reserve(state_size(registry.len(), trailer.len()));
    out.extend_from_slice(&STATE_MAGIC);
    out.extend_from_slice(&STATE_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(registry.len() as u32).to_le_bytes());
    for param in registry.iter() {
        out.extend_from_slice(&param.normalized().to_le_bytes());
    }
    out.extend_from_slice(&(trailer.len() as u32).to_le_bytes());
    out.extend_from_slice(trailer);
}

/// A fully validated state blob, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedState<'a> {
    values: Vec<f64>,
    trailer: &'a [u8],
}

impl<'a> DecodedState<'a> {
    /// Parse and validate `bytes` against a registry of `registered` parameters.
    ///
    /// A blob may hold fewer values than the registry (parameters appended
    /// since it was written) but never more.
    pub fn decode(bytes: &'a [u8], registered: usize) -> Result<Self, StateError> {
        let mut reader = Reader { bytes, pos: 0 };

        if reader.take(4)? != STATE_MAGIC {
            return Err(StateError::BadMagic);
        }
        let version = reader.u16()?;
        if version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(version));
        }
        let _reserved = reader.u16()?;

        let stored = reader.u32()? as usize;
        if stored > registered {
            return Err(StateError::TooManyParameters { stored, registered });
        }

        let mut values = Vec::with_capacity(stored);
        for index in 0..stored {
            let value = reader.f64()?;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(StateError::InvalidValue { index, value });
            }
            values.push(value);
        }

        let trailer_len = reader.u32()? as usize;
        let trailer = reader.take(trailer_len)?;
        if reader.remaining() != 0 {
            return Err(StateError::TrailingBytes(reader.remaining()));
        }

        Ok(Self { values, trailer })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn trailer(&self) -> &'a [u8] {
        self.trailer
    }

    /// Write the stored values into `registry`; parameters missing from the
    /// blob go back to their defaults.
    pub fn apply(&self, registry: &ParameterRegistry) {
        for (index, param) in registry.iter().enumerate() {
            match self.values.get(index) {
                Some(value) => {
                    param.set_normalized(*value);
                }
                None => param.reset(),
            }
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        let end = self.pos.checked_add(len).ok_or(StateError::Truncated {
            needed: usize::MAX,
            available: self.bytes.len(),
        })?;
        let slice = self.bytes.get(self.pos..end).ok_or(StateError::Truncated {
            needed: end,
            available: self.bytes.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, StateError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, StateError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self) -> Result<f64, StateError> {
        let b = self.take(VALUE_SIZE)?;
        let mut raw = [0u8; VALUE_SIZE];
        raw.copy_from_slice(b);
        Ok(f64::from_le_bytes(raw))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
