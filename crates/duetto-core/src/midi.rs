//! Raw MIDI and SysEx events exchanged between host, processor and editor.
//!
//! Both types are fixed-size (SysEx stores up to [`SYSEX_MAX_SIZE`] bytes
//! inline) so they can be copied through the bridge queues without touching
//! the allocator on the audio thread.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Largest SysEx message carried inline.
pub const SYSEX_MAX_SIZE: usize = 512;

/// Size of a [`MidiMessage`] on the wire: offset (i32 LE), three data bytes, one pad byte.
pub const MIDI_WIRE_SIZE: usize = 8;

pub type SysExBytes = SmallVec<[u8; SYSEX_MAX_SIZE]>;

/// A short (channel voice / system common) MIDI message with its sample offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MidiMessage {
    /// Offset in samples from the start of the current block.
    pub offset: i32,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub fn new(offset: i32, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            offset,
            status,
            data1,
            data2,
        }
    }

    pub fn note_on(offset: i32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(offset, 0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
    }

    pub fn note_off(offset: i32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(offset, 0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
    }

    pub fn control_change(offset: i32, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(offset, 0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F)
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.status & 0xF0 == 0x90 && self.data2 > 0
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.status & 0xF0 == 0x80 || (self.status & 0xF0 == 0x90 && self.data2 == 0)
    }

    pub fn to_wire(&self) -> [u8; MIDI_WIRE_SIZE] {
        let offset = self.offset.to_le_bytes();
        [
            offset[0],
            offset[1],
            offset[2],
            offset[3],
            self.status,
            self.data1,
            self.data2,
            0,
        ]
    }

    /// Decode the wire form; `None` unless `bytes` is exactly [`MIDI_WIRE_SIZE`] long.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != MIDI_WIRE_SIZE {
            return None;
        }
        let offset = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Some(Self::new(offset, bytes[4], bytes[5], bytes[6]))
    }
}

/// A SysEx message with its sample offset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SysExData {
    pub offset: i32,
    data: SysExBytes,
}

impl SysExData {
    /// Copy `bytes` into inline storage. Fails instead of spilling to the heap.
    pub fn new(offset: i32, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > SYSEX_MAX_SIZE {
            return Err(Error::PayloadTooLarge {
                len: bytes.len(),
                max: SYSEX_MAX_SIZE,
            });
        }
        Ok(Self {
            offset,
            data: SmallVec::from_slice(bytes),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
