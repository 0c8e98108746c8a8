//! Little-endian primitive codec.
//!
//! Reads are pure functions of an immutable buffer and an absolute offset.
//! Writes go through [`BinaryWriter`], a growable buffer with a movable
//! cursor so placeholder bytes can be patched after the fact.
//!
//! An out-of-range read means the catalog is corrupt or the caller computed
//! a bad offset; both are defects, so reads panic with the offending offset
//! rather than returning an error.

use crate::Guid;

/// Borrow `len` bytes at `offset`, panicking with context when out of range.
#[track_caller]
pub fn bytes_at(data: &[u8], offset: usize, len: usize) -> &[u8] {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => &data[offset..end],
        _ => bounds_violation(data.len(), offset, len),
    }
}

#[cold]
#[track_caller]
fn bounds_violation(table_len: usize, offset: usize, len: usize) -> ! {
    panic!(
        "catalog read of {} bytes at offset {} is outside table of length {}",
        len, offset, table_len
    )
}

#[track_caller]
pub fn read_u8(data: &[u8], offset: usize) -> u8 {
    bytes_at(data, offset, 1)[0]
}

#[track_caller]
pub fn read_bool(data: &[u8], offset: usize) -> bool {
    read_u8(data, offset) != 0
}

#[track_caller]
pub fn read_i32(data: &[u8], offset: usize) -> i32 {
    let bytes = bytes_at(data, offset, 4);
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[track_caller]
pub fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_i32(data, offset) as u32)
}

#[track_caller]
pub fn read_guid(data: &[u8], offset: usize) -> Guid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(bytes_at(data, offset, Guid::SIZE));
    Guid::from_bytes(bytes)
}

/// Read a row reference; `-1` decodes as `None`.
#[track_caller]
pub fn read_optional_offset(data: &[u8], offset: usize) -> Option<usize> {
    let value = read_i32(data, offset);
    (value >= 0).then_some(value as usize)
}

/// Read a length-prefixed UTF-8 string. The prefix is the byte length.
#[track_caller]
pub fn read_str(data: &[u8], offset: usize) -> &str {
    let len = read_i32(data, offset);
    if len < 0 {
        panic!("negative string length {} at offset {}", len, offset);
    }
    let bytes = bytes_at(data, offset + 4, len as usize);
    match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => panic!("corrupt UTF-8 string at offset {}: {}", offset, e),
    }
}

/// Growable little-endian buffer with a repositionable write cursor.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
    position: usize,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor, e.g. back to a placeholder written earlier.
    pub fn set_position(&mut self, position: usize) {
        assert!(
            position <= self.buffer.len(),
            "cannot seek to {} past end {}",
            position,
            self.buffer.len()
        );
        self.position = position;
    }

    pub fn seek_to_end(&mut self) {
        self.position = self.buffer.len();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Write bytes at the cursor, overwriting and then extending as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_guid(&mut self, value: &Guid) {
        self.write_bytes(value.as_bytes());
    }

    /// Write a byte-length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) {
        self.write_i32(value.len() as i32);
        self.write_bytes(value.as_bytes());
    }

    /// Write a length-prefixed array, encoding each element with `write`.
    pub fn write_array<T, F>(&mut self, items: &[T], mut write: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.write_i32(items.len() as i32);
        for item in items {
            write(self, item);
        }
    }

    /// Overwrite a previously written `i32` without moving the cursor.
    pub fn patch_i32(&mut self, at: usize, value: i32) {
        let saved = self.position;
        self.set_position(at);
        self.write_i32(value);
        self.position = saved;
    }
}
