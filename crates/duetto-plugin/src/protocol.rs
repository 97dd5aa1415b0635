//! Messages exchanged between the editor (UI thread) and the processor (audio thread).
//!
//! Inside one process the bridge queues carry [`EditorMessage`] and
//! [`ProcessorMessage`] directly: both are fixed-size, so constructing and
//! pushing one on the audio thread never touches the allocator.
//!
//! When editor and processor live in separate processes, messages are
//! converted to an [`Envelope`]: a short ASCII opcode plus named, typed
//! fields, serialized with bincode. Unknown fields are ignored on decode so
//! either side may add fields without breaking the other.

use crate::error::ProtocolError;
use duetto_core::{MidiMessage, SysExData, MIDI_WIRE_SIZE};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Tag value meaning "not addressable".
pub const NO_TAG: i32 = -1;

/// Maximum inline payload carried by control and arbitrary messages.
pub const PAYLOAD_MAX_SIZE: usize = 256;

/// Identifies a UI control. Tags at or below [`NO_TAG`] address nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlTag(pub i32);

impl ControlTag {
    pub const NONE: ControlTag = ControlTag(NO_TAG);

    pub fn is_addressable(self) -> bool {
        self.0 > NO_TAG
    }
}

impl Default for ControlTag {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<i32> for ControlTag {
    fn from(tag: i32) -> Self {
        Self(tag)
    }
}

/// Opaque bytes attached to a control or arbitrary message, stored inline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(SmallVec<[u8; PAYLOAD_MAX_SIZE]>);

impl Payload {
    pub fn new(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() > PAYLOAD_MAX_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                len: bytes.len(),
                max: PAYLOAD_MAX_SIZE,
            });
        }
        Ok(Self(SmallVec::from_slice(bytes)))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// UI → processor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorMessage {
    /// A control changed value. `param_index` is set when the control is
    /// bound to a parameter.
    ControlValueChanged {
        control_tag: ControlTag,
        param_index: Option<usize>,
        normalized: f64,
    },
    ControlMessage {
        control_tag: ControlTag,
        message_tag: i32,
        payload: Payload,
    },
    ArbitraryMessage {
        message_tag: i32,
        payload: Payload,
    },
    MidiFromUi(MidiMessage),
    SysExFromUi(SysExData),
}

/// Processor → UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorMessage {
    /// A parameter value changed on the processor side (automation,
    /// state restore, or the echo of a UI edit).
    ParamValueToUi { param_index: usize, normalized: f64 },
    ControlValueToUi {
        control_tag: ControlTag,
        normalized: f64,
    },
    ControlMessageToUi {
        control_tag: ControlTag,
        message_tag: i32,
        payload: Payload,
    },
    ArbitraryMessageToUi {
        message_tag: i32,
        payload: Payload,
    },
    MidiFromProcessor(MidiMessage),
    SysExFromProcessor(SysExData),
}

// ============================================================================
// Envelope
// ============================================================================

/// Opcodes. UI-originated messages end in `UI`, processor-originated ones in `D`
/// (for "delegate").
pub mod opcode {
    pub const CONTROL_VALUE_FROM_UI: &str = "SCVFUI";
    pub const CONTROL_MSG_FROM_UI: &str = "SCMFUI";
    pub const ARBITRARY_MSG_FROM_UI: &str = "SAMFUI";
    pub const MIDI_MSG_FROM_UI: &str = "SMMFUI";
    pub const SYSEX_MSG_FROM_UI: &str = "SSMFUI";

    pub const PARAM_VALUE_FROM_DELEGATE: &str = "SPVFD";
    pub const CONTROL_VALUE_FROM_DELEGATE: &str = "SCVFD";
    pub const CONTROL_MSG_FROM_DELEGATE: &str = "SCMFD";
    pub const ARBITRARY_MSG_FROM_DELEGATE: &str = "SAMFD";
    pub const MIDI_MSG_FROM_DELEGATE: &str = "SMMFD";
    pub const SYSEX_MSG_FROM_DELEGATE: &str = "SSMFD";
}

/// Field names.
pub mod field {
    /// Control tag (int).
    pub const CONTROL_TAG: &str = "CT";
    /// Normalized value (float).
    pub const NORMALIZED_VALUE: &str = "NV";
    /// Message tag (int).
    pub const MESSAGE_TAG: &str = "MT";
    /// Payload bytes (binary).
    pub const DATA: &str = "D";
    /// Sample offset (int).
    pub const OFFSET: &str = "O";
    /// Parameter index (int).
    pub const PARAM_INDEX: &str = "PI";
}

const NAME_MAX_LEN: usize = 8;

/// 1-8 printable ASCII characters, stored inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortName {
    bytes: [u8; NAME_MAX_LEN],
    len: u8,
}

impl ShortName {
    pub fn new(name: &str) -> Result<Self, ProtocolError> {
        let raw = name.as_bytes();
        if raw.is_empty()
            || raw.len() > NAME_MAX_LEN
            || !raw.iter().all(|b| b.is_ascii_graphic())
        {
            return Err(ProtocolError::InvalidName(name.to_string()));
        }
        let mut bytes = [0u8; NAME_MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        let len = (self.len as usize).min(NAME_MAX_LEN);
        // Constructed from validated ASCII; a corrupt frame degrades to "".
        std::str::from_utf8(&self.bytes[..len]).unwrap_or("")
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: ShortName,
    pub value: FieldValue,
}

/// Self-describing message frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    opcode: ShortName,
    fields: Vec<Field>,
}

impl Envelope {
    pub fn new(opcode: &str) -> Result<Self, ProtocolError> {
        Ok(Self {
            opcode: ShortName::new(opcode)?,
            fields: Vec::new(),
        })
    }

    /// Builder-style; only used with the static field names in [`field`].
    fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        if let Ok(name) = ShortName::new(name) {
            self.fields.push(Field { name, value });
        }
        self
    }

    pub fn with_int(self, name: &'static str, value: i64) -> Self {
        self.with(name, FieldValue::Int(value))
    }

    pub fn with_float(self, name: &'static str, value: f64) -> Self {
        self.with(name, FieldValue::Float(value))
    }

    pub fn with_binary(self, name: &'static str, value: &[u8]) -> Self {
        self.with(name, FieldValue::Binary(value.to_vec()))
    }

    pub fn opcode(&self) -> &str {
        self.opcode.as_str()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// First field with this name, if any.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name.as_str() == name)
            .map(|f| &f.value)
    }

    fn missing(&self, field: &'static str) -> ProtocolError {
        ProtocolError::MissingField {
            opcode: self.opcode().to_string(),
            field,
        }
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str) -> ProtocolError {
        ProtocolError::WrongFieldType {
            opcode: self.opcode().to_string(),
            field,
            expected,
        }
    }

    fn out_of_range(&self, field: &'static str) -> ProtocolError {
        ProtocolError::OutOfRange {
            opcode: self.opcode().to_string(),
            field,
        }
    }

    pub fn int(&self, name: &'static str) -> Result<i64, ProtocolError> {
        match self.field(name) {
            Some(FieldValue::Int(v)) => Ok(*v),
            Some(_) => Err(self.wrong_type(name, "int")),
            None => Err(self.missing(name)),
        }
    }

    pub fn float(&self, name: &'static str) -> Result<f64, ProtocolError> {
        match self.field(name) {
            Some(FieldValue::Float(v)) => Ok(*v),
            Some(_) => Err(self.wrong_type(name, "float")),
            None => Err(self.missing(name)),
        }
    }

    pub fn binary(&self, name: &'static str) -> Result<&[u8], ProtocolError> {
        match self.field(name) {
            Some(FieldValue::Binary(v)) => Ok(v),
            Some(_) => Err(self.wrong_type(name, "binary")),
            None => Err(self.missing(name)),
        }
    }

    fn i32_field(&self, name: &'static str) -> Result<i32, ProtocolError> {
        i32::try_from(self.int(name)?).map_err(|_| self.out_of_range(name))
    }

    fn index_field(&self, name: &'static str) -> Result<usize, ProtocolError> {
        usize::try_from(self.int(name)?).map_err(|_| self.out_of_range(name))
    }

    fn normalized_field(&self, name: &'static str) -> Result<f64, ProtocolError> {
        let value = self.float(name)?;
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(self.out_of_range(name))
        }
    }

    fn payload_field(&self, name: &'static str) -> Result<Payload, ProtocolError> {
        Payload::new(self.binary(name)?)
    }

    fn midi_field(&self, name: &'static str) -> Result<MidiMessage, ProtocolError> {
        let data = self.binary(name)?;
        if data.len() != MIDI_WIRE_SIZE {
            return Err(self.out_of_range(name));
        }
        MidiMessage::from_wire(data).ok_or_else(|| self.out_of_range(name))
    }

    fn sysex_fields(&self) -> Result<SysExData, ProtocolError> {
        let data = self.binary(field::DATA)?;
        let offset = self.i32_field(field::OFFSET)?;
        SysExData::new(offset, data).map_err(|_| ProtocolError::PayloadTooLarge {
            len: data.len(),
            max: duetto_core::SYSEX_MAX_SIZE,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            bincode::deserialize(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))?;
        // The frame may come from a foreign writer.
        ShortName::new(envelope.opcode.as_str())?;
        Ok(envelope)
    }
}

/// Arbitrary messages always carry at least one byte on the wire.
fn arbitrary_data(payload: &Payload) -> &[u8] {
    if payload.is_empty() {
        &[0u8]
    } else {
        payload.as_slice()
    }
}

fn envelope(opcode: &'static str) -> Envelope {
    Envelope {
        opcode: ShortName::new(opcode).unwrap_or(ShortName {
            bytes: [0; NAME_MAX_LEN],
            len: 0,
        }),
        fields: Vec::with_capacity(4),
    }
}

impl From<&EditorMessage> for Envelope {
    fn from(msg: &EditorMessage) -> Self {
        match msg {
            EditorMessage::ControlValueChanged {
                control_tag,
                param_index,
                normalized,
            } => {
                let env = envelope(opcode::CONTROL_VALUE_FROM_UI)
                    .with_int(field::CONTROL_TAG, control_tag.0 as i64)
                    .with_float(field::NORMALIZED_VALUE, *normalized);
                match param_index {
                    Some(index) => env.with_int(field::PARAM_INDEX, *index as i64),
                    None => env,
                }
            }
            EditorMessage::ControlMessage {
                control_tag,
                message_tag,
                payload,
            } => envelope(opcode::CONTROL_MSG_FROM_UI)
                .with_int(field::CONTROL_TAG, control_tag.0 as i64)
                .with_int(field::MESSAGE_TAG, *message_tag as i64)
                .with_binary(field::DATA, payload.as_slice()),
            EditorMessage::ArbitraryMessage {
                message_tag,
                payload,
            } => envelope(opcode::ARBITRARY_MSG_FROM_UI)
                .with_int(field::MESSAGE_TAG, *message_tag as i64)
                .with_int(field::CONTROL_TAG, NO_TAG as i64)
                .with_binary(field::DATA, arbitrary_data(payload)),
            EditorMessage::MidiFromUi(midi) => {
                envelope(opcode::MIDI_MSG_FROM_UI).with_binary(field::DATA, &midi.to_wire())
            }
            EditorMessage::SysExFromUi(sysex) => envelope(opcode::SYSEX_MSG_FROM_UI)
                .with_binary(field::DATA, sysex.bytes())
                .with_int(field::OFFSET, sysex.offset as i64),
        }
    }
}

impl TryFrom<&Envelope> for EditorMessage {
    type Error = ProtocolError;

    fn try_from(env: &Envelope) -> Result<Self, ProtocolError> {
        match env.opcode() {
            opcode::CONTROL_VALUE_FROM_UI => Ok(EditorMessage::ControlValueChanged {
                control_tag: ControlTag(env.i32_field(field::CONTROL_TAG)?),
                param_index: match env.field(field::PARAM_INDEX) {
                    Some(_) => Some(env.index_field(field::PARAM_INDEX)?),
                    None => None,
                },
                normalized: env.normalized_field(field::NORMALIZED_VALUE)?,
            }),
            opcode::CONTROL_MSG_FROM_UI => Ok(EditorMessage::ControlMessage {
                control_tag: ControlTag(env.i32_field(field::CONTROL_TAG)?),
                message_tag: env.i32_field(field::MESSAGE_TAG)?,
                payload: env.payload_field(field::DATA)?,
            }),
            opcode::ARBITRARY_MSG_FROM_UI => Ok(EditorMessage::ArbitraryMessage {
                message_tag: env.i32_field(field::MESSAGE_TAG)?,
                payload: env.payload_field(field::DATA)?,
            }),
            opcode::MIDI_MSG_FROM_UI => Ok(EditorMessage::MidiFromUi(env.midi_field(field::DATA)?)),
            opcode::SYSEX_MSG_FROM_UI => Ok(EditorMessage::SysExFromUi(env.sysex_fields()?)),
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}

impl From<&ProcessorMessage> for Envelope {
    fn from(msg: &ProcessorMessage) -> Self {
        match msg {
            ProcessorMessage::ParamValueToUi {
                param_index,
                normalized,
            } => envelope(opcode::PARAM_VALUE_FROM_DELEGATE)
                .with_int(field::PARAM_INDEX, *param_index as i64)
                .with_float(field::NORMALIZED_VALUE, *normalized),
            ProcessorMessage::ControlValueToUi {
                control_tag,
                normalized,
            } => envelope(opcode::CONTROL_VALUE_FROM_DELEGATE)
                .with_int(field::CONTROL_TAG, control_tag.0 as i64)
                .with_float(field::NORMALIZED_VALUE, *normalized),
            ProcessorMessage::ControlMessageToUi {
                control_tag,
                message_tag,
                payload,
            } => envelope(opcode::CONTROL_MSG_FROM_DELEGATE)
                .with_int(field::CONTROL_TAG, control_tag.0 as i64)
                .with_int(field::MESSAGE_TAG, *message_tag as i64)
                .with_binary(field::DATA, payload.as_slice()),
            ProcessorMessage::ArbitraryMessageToUi {
                message_tag,
                payload,
            } => envelope(opcode::ARBITRARY_MSG_FROM_DELEGATE)
                .with_int(field::MESSAGE_TAG, *message_tag as i64)
                .with_binary(field::DATA, arbitrary_data(payload)),
            ProcessorMessage::MidiFromProcessor(midi) => {
                envelope(opcode::MIDI_MSG_FROM_DELEGATE).with_binary(field::DATA, &midi.to_wire())
            }
            ProcessorMessage::SysExFromProcessor(sysex) => {
                envelope(opcode::SYSEX_MSG_FROM_DELEGATE)
                    .with_binary(field::DATA, sysex.bytes())
                    .with_int(field::OFFSET, sysex.offset as i64)
            }
        }
    }
}

impl TryFrom<&Envelope> for ProcessorMessage {
    type Error = ProtocolError;

    fn try_from(env: &Envelope) -> Result<Self, ProtocolError> {
        match env.opcode() {
            opcode::PARAM_VALUE_FROM_DELEGATE => Ok(ProcessorMessage::ParamValueToUi {
                param_index: env.index_field(field::PARAM_INDEX)?,
                normalized: env.normalized_field(field::NORMALIZED_VALUE)?,
            }),
            opcode::CONTROL_VALUE_FROM_DELEGATE => Ok(ProcessorMessage::ControlValueToUi {
                control_tag: ControlTag(env.i32_field(field::CONTROL_TAG)?),
                normalized: env.normalized_field(field::NORMALIZED_VALUE)?,
            }),
            opcode::CONTROL_MSG_FROM_DELEGATE => Ok(ProcessorMessage::ControlMessageToUi {
                control_tag: ControlTag(env.i32_field(field::CONTROL_TAG)?),
                message_tag: env.i32_field(field::MESSAGE_TAG)?,
                payload: env.payload_field(field::DATA)?,
            }),
            opcode::ARBITRARY_MSG_FROM_DELEGATE => Ok(ProcessorMessage::ArbitraryMessageToUi {
                message_tag: env.i32_field(field::MESSAGE_TAG)?,
                payload: env.payload_field(field::DATA)?,
            }),
            opcode::MIDI_MSG_FROM_DELEGATE => Ok(ProcessorMessage::MidiFromProcessor(
                env.midi_field(field::DATA)?,
            )),
            opcode::SYSEX_MSG_FROM_DELEGATE => {
                Ok(ProcessorMessage::SysExFromProcessor(env.sysex_fields()?))
            }
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}
