//! Record codec
//!
//! Encoding and decoding of [`Record`]s to and from store values. See the
//! module docs in `record/mod.rs` for the byte layout.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::{FieldSet, Record};
use crate::error::{RecordKvError, Result};

/// Leading bytes of every encoded record
pub const MAGIC: &[u8; 2] = b"RK";

/// Current layout version
pub const FORMAT_VERSION: u8 = 1;

/// Magic (2) + version (1) + field count (4)
pub const HEADER_SIZE: usize = 7;

/// CRC32 of everything before it
pub const FOOTER_SIZE: usize = 4;

/// Type tag for opaque byte values
pub const TYPE_BYTES: u8 = 0x01;

/// Maximum length of a single field name or value (16 MB)
pub const MAX_FIELD_SIZE: u32 = 16 * 1024 * 1024;

/// Maximum number of fields in one record
pub const MAX_FIELD_COUNT: u32 = 65_536;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record into a single store value
///
/// Fields are written in name order, so equal records always produce equal
/// bytes. Fails if the record has more than [`MAX_FIELD_COUNT`] fields or a
/// name or value is longer than [`MAX_FIELD_SIZE`], since `decode` would
/// reject the result.
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    if record.len() > MAX_FIELD_COUNT as usize {
        return Err(RecordKvError::UnsupportedType(format!(
            "record has {} fields (max {})",
            record.len(),
            MAX_FIELD_COUNT
        )));
    }
    let field_count = record.len() as u32;

    let mut buf = Vec::with_capacity(
        HEADER_SIZE + FOOTER_SIZE + record.len() * 9 + record.payload_size(),
    );
    buf.extend_from_slice(MAGIC);
    buf.push(FORMAT_VERSION);
    buf.extend_from_slice(&field_count.to_be_bytes());

    for (name, value) in record.iter() {
        let name_len = encodable_len(name.len(), name, "name")?;
        let value_len = encodable_len(value.len(), name, "value")?;

        buf.extend_from_slice(&name_len.to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.push(TYPE_BYTES);
        buf.extend_from_slice(&value_len.to_be_bytes());
        buf.extend_from_slice(value);
    }

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_be_bytes());

    Ok(buf)
}

fn encodable_len(len: usize, field: &str, what: &str) -> Result<u32> {
    if len > MAX_FIELD_SIZE as usize {
        return Err(RecordKvError::UnsupportedType(format!(
            "field '{}': {} too large: {} bytes (max {})",
            field, what, len, MAX_FIELD_SIZE
        )));
    }
    Ok(len as u32)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a store value back into a record
///
/// Structural problems (truncation, bad magic, checksum mismatch, ...) are
/// `CorruptRecord`. A well-formed field that cannot be turned into a
/// name/bytes pair is `UnsupportedType`.
pub fn decode(bytes: &[u8]) -> Result<Record> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(corrupt(format!(
            "value too short: expected at least {} bytes, got {}",
            HEADER_SIZE + FOOTER_SIZE,
            bytes.len()
        )));
    }

    let (body, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);

    if &body[0..2] != MAGIC {
        return Err(corrupt(format!(
            "bad magic: 0x{:02x}{:02x}",
            body[0], body[1]
        )));
    }

    let version = body[2];
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unknown format version {}", version)));
    }

    let stored_crc = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(corrupt(format!(
            "checksum mismatch: stored 0x{:08x}, computed 0x{:08x}",
            stored_crc, actual_crc
        )));
    }

    let field_count = u32::from_be_bytes([body[3], body[4], body[5], body[6]]);
    if field_count > MAX_FIELD_COUNT {
        return Err(corrupt(format!(
            "too many fields: {} (max {})",
            field_count, MAX_FIELD_COUNT
        )));
    }

    let mut reader = FieldReader::new(&body[HEADER_SIZE..]);
    let mut fields = BTreeMap::new();

    for index in 0..field_count {
        let name_len = reader.read_len(index, "name")?;
        let name_bytes = reader.read_slice(index, name_len, "name")?;
        let type_tag = reader.read_u8(index, "type tag")?;
        let value_len = reader.read_len(index, "value")?;
        let value = reader.read_slice(index, value_len, "value")?;

        let name = std::str::from_utf8(name_bytes).map_err(|e| {
            RecordKvError::UnsupportedType(format!("field {}: name is not UTF-8: {}", index, e))
        })?;

        if type_tag != TYPE_BYTES {
            return Err(RecordKvError::UnsupportedType(format!(
                "field '{}': unknown type tag 0x{:02x}",
                name, type_tag
            )));
        }

        if fields
            .insert(name.to_string(), Bytes::copy_from_slice(value))
            .is_some()
        {
            return Err(corrupt(format!("duplicate field name '{}'", name)));
        }
    }

    if reader.remaining() != 0 {
        return Err(corrupt(format!(
            "{} trailing bytes after {} fields",
            reader.remaining(),
            field_count
        )));
    }

    Ok(Record { fields })
}

/// Decode a store value and keep only the requested fields
///
/// The whole value is validated even when only a few fields are wanted.
pub fn decode_fields(bytes: &[u8], fields: Option<&FieldSet>) -> Result<Record> {
    decode(bytes).map(|record| record.project(fields))
}

fn corrupt(message: String) -> RecordKvError {
    RecordKvError::CorruptRecord(message)
}

/// Bounds-checked cursor over the field section
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_slice(&mut self, index: u32, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(corrupt(format!(
                "field {}: truncated {} (expected {} bytes, got {})",
                index,
                what,
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self, index: u32, what: &str) -> Result<u8> {
        Ok(self.read_slice(index, 1, what)?[0])
    }

    fn read_u32(&mut self, index: u32, what: &str) -> Result<u32> {
        let b = self.read_slice(index, 4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a length prefix, rejecting anything above `MAX_FIELD_SIZE`
    fn read_len(&mut self, index: u32, what: &str) -> Result<usize> {
        let len = self.read_u32(index, what)?;
        if len > MAX_FIELD_SIZE {
            return Err(corrupt(format!(
                "field {}: {} too large: {} bytes (max {})",
                index, what, len, MAX_FIELD_SIZE
            )));
        }
        Ok(len as usize)
    }
}
