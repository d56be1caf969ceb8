use super::schema::{Block, Composite, Conversion, Device, Field, Kind, WordOrder};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tokio_modbus::Address;

#[derive(Serialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

/// Flat field name to value mapping produced by one decode, in register order.
#[derive(Serialize, Debug, Default, PartialEq, Clone)]
#[serde(transparent)]
pub struct Payload(IndexMap<&'static str, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<Value>) {
        self.0.insert(name, value.into());
    }

    pub fn extend(&mut self, other: Payload) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw words read from one block of registers.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RegisterBlock {
    pub start_address: Address,
    pub words: Vec<u16>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("block {block} at {start} expects {expected} registers, got {actual}")]
    LengthMismatch {
        block: &'static str,
        start: Address,
        expected: usize,
        actual: usize,
    },
    #[error("no registers supplied for block {block} at {start}")]
    MissingBlock { block: &'static str, start: Address },
    #[error("registers at {start} are not part of the {device} layout")]
    UnknownBlock { device: &'static str, start: Address },
    #[error("{composite} in block {block} needs undecoded field {field}")]
    MissingField {
        block: &'static str,
        composite: &'static str,
        field: &'static str,
    },
}

struct Cursor<'a> {
    words: &'a [u16],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(words: &'a [u16]) -> Self {
        Self { words, pos: 0 }
    }

    fn byte(&mut self) -> u8 {
        let [msb, lsb] = self.words[self.pos / 2].to_be_bytes();
        let byte = if self.pos % 2 == 0 { msb } else { lsb };
        self.pos += 1;
        byte
    }

    fn word(&mut self) -> u16 {
        u16::from_be_bytes([self.byte(), self.byte()])
    }

    fn double_word(&mut self, order: WordOrder) -> u32 {
        let first = self.word() as u32;
        let second = self.word() as u32;

        match order {
            WordOrder::HighFirst => (first << 16) | second,
            WordOrder::LowFirst => (second << 16) | first,
        }
    }

    fn skip(&mut self, bytes: usize) {
        self.pos += bytes;
    }
}

#[derive(Copy, Clone)]
enum Raw {
    Int(i64),
    Float(f64),
}

impl Raw {
    fn as_i64(self) -> i64 {
        match self {
            Raw::Int(value) => value,
            Raw::Float(value) => value as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Raw::Int(value) => value as f64,
            Raw::Float(value) => value,
        }
    }
}

impl From<Raw> for Value {
    fn from(raw: Raw) -> Self {
        match raw {
            Raw::Int(value) => Value::Int(value),
            Raw::Float(value) => Value::Float(value),
        }
    }
}

fn decode_field(field: &Field, cursor: &mut Cursor, payload: &mut Payload) {
    let raw = match field.kind {
        Kind::U8 => Raw::Int(cursor.byte().into()),
        Kind::I8 => Raw::Int((cursor.byte() as i8).into()),
        Kind::U16 => Raw::Int(cursor.word().into()),
        Kind::I16 => Raw::Int((cursor.word() as i16).into()),
        Kind::U32(order) => Raw::Int(cursor.double_word(order).into()),
        Kind::I32(order) => Raw::Int((cursor.double_word(order) as i32).into()),
        Kind::F32(order) => Raw::Float(f32::from_bits(cursor.double_word(order)).into()),
        Kind::Skip(bytes) => {
            cursor.skip(bytes);
            payload.insert(field.name, Value::Null);
            return;
        },
    };

    match field.conversion {
        Conversion::Raw => payload.insert(field.name, raw),
        Conversion::Scale { divisor, offset } => payload.insert(field.name, raw.as_f64() / divisor + offset),
        Conversion::Lookup { table, text } => {
            payload.insert(field.name, raw);
            payload.insert(text, table.text(raw.as_i64()));
        },
        Conversion::Flags(groups) => {
            let bits = raw.as_i64();
            payload.insert(field.name, raw);

            for group in groups {
                let value = (bits & i64::from(group.mask)) >> group.shift;
                payload.insert(group.name, value);

                if let Some((table, text)) = group.lookup {
                    payload.insert(text, table.text(value));
                }
            }
        },
    }
}

fn compose(block: &Block, composite: &Composite, payload: &mut Payload) -> Result<(), DecodeError> {
    let part = |field: &'static str| {
        payload.int(field).ok_or(DecodeError::MissingField {
            block: block.name,
            composite: composite.name(),
            field,
        })
    };

    let value = match *composite {
        Composite::Ascii { parts, .. } => {
            let mut text = String::with_capacity(parts.len());
            for &name in parts {
                text.push(char::from(part(name)? as u8));
            }
            text.trim_end_matches('\0').to_owned()
        },
        Composite::Mac { parts, .. } => {
            let mut octets = Vec::with_capacity(parts.len());
            for name in parts {
                octets.push(format!("{:02X}", part(name)? as u8));
            }
            octets.join(":")
        },
        Composite::Date { year, month, day, .. } => {
            format!("{:04}-{:02}-{:02}", part(year)?, part(month)?, part(day)?)
        },
    };

    payload.insert(composite.name(), value);
    Ok(())
}

/// Decodes one block. The word count has to match the layout exactly, a
/// short or long read is rejected as a whole.
pub fn decode(block: &Block, words: &[u16]) -> Result<Payload, DecodeError> {
    let expected = block.word_count();

    if words.len() != expected {
        return Err(DecodeError::LengthMismatch {
            block: block.name,
            start: block.start,
            expected,
            actual: words.len(),
        });
    }

    let mut cursor = Cursor::new(words);
    let mut payload = Payload::new();

    for field in block.fields {
        decode_field(field, &mut cursor, &mut payload);
    }

    for composite in block.composites {
        compose(block, composite, &mut payload)?;
    }

    Ok(payload)
}

/// Decodes every block of `device` and runs its derivations on the merged
/// result. All blocks have to be present.
pub fn decode_device(device: &Device, blocks: &[RegisterBlock]) -> Result<Payload, DecodeError> {
    if let Some(stray) = blocks.iter().find(|supplied| device.block_at(supplied.start_address).is_none()) {
        return Err(DecodeError::UnknownBlock { device: device.name, start: stray.start_address });
    }

    let mut payload = Payload::new();

    for block in device.blocks {
        let supplied = blocks
            .iter()
            .find(|supplied| supplied.start_address == block.start)
            .ok_or(DecodeError::MissingBlock { block: block.name, start: block.start })?;

        payload.extend(decode(block, &supplied.words)?);
    }

    for derivation in device.derivations {
        derivation(&mut payload);
    }

    Ok(payload)
}
