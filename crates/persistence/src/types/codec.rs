//! Fixed-width field encoding.
//!
//! Records are written field by field into a buffer of exactly the record's width.
//! Text fields occupy a fixed number of bytes: UTF-8, NUL padded, with at least one
//! trailing NUL, so a field of size `N` holds at most `N - 1` bytes.

use chrono::{DateTime, Utc};

use crate::error::{FormatError, StorageResult, ValidationError};
use crate::types::{BoundedIds, NO_ID};

/// Sequential writer over a record buffer.
pub struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> &mut [u8] {
        let start = self.pos;
        self.pos += len;
        &mut self.buf[start..self.pos]
    }

    pub fn put_i32(&mut self, value: i32) {
        self.take(4).copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.take(8).copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.take(4).copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.take(1)[0] = u8::from(value);
    }

    pub fn put_time(&mut self, value: DateTime<Utc>) {
        self.put_i64(value.timestamp());
    }

    /// Writes `value` into a `width`-byte text field.
    pub fn put_str(&mut self, field: &'static str, value: &str, width: usize) -> StorageResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() >= width {
            return Err(ValidationError::FieldTooLong {
                field,
                len: bytes.len(),
                max: width - 1,
            }
            .into());
        }
        let slot = self.take(width);
        slot.fill(0);
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a count followed by `N` slots, unused ones as -1.
    pub fn put_ids<const N: usize>(&mut self, ids: &BoundedIds<N>) {
        self.put_i32(ids.len() as i32);
        for slot in 0..N {
            self.put_i32(ids.get(slot).unwrap_or(NO_ID));
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Sequential reader over a record buffer.
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    record: &'static str,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8], record: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            record,
        }
    }

    fn take<const L: usize>(&mut self) -> [u8; L] {
        let mut out = [0u8; L];
        out.copy_from_slice(&self.buf[self.pos..self.pos + L]);
        self.pos += L;
        out
    }

    pub fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take::<4>())
    }

    pub fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take::<8>())
    }

    pub fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take::<4>())
    }

    pub fn bool(&mut self) -> bool {
        self.take::<1>()[0] != 0
    }

    pub fn time(&mut self, field: &'static str) -> StorageResult<DateTime<Utc>> {
        let secs = self.i64();
        DateTime::from_timestamp(secs, 0).ok_or_else(|| self.corrupt(field, format!("timestamp {secs} out of range")))
    }

    /// Reads a `width`-byte text field up to its first NUL.
    pub fn str(&mut self, field: &'static str, width: usize) -> StorageResult<String> {
        let raw = &self.buf[self.pos..self.pos + width];
        self.pos += width;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8(raw[..end].to_vec()).map_err(|e| self.corrupt(field, e.to_string()))
    }

    /// Reads a bounded ID list written by [`FieldWriter::put_ids`].
    pub fn ids<const N: usize>(&mut self, field: &'static str) -> StorageResult<BoundedIds<N>> {
        let count = self.i32();
        let mut slots = [NO_ID; N];
        for slot in slots.iter_mut() {
            *slot = self.i32();
        }
        if count < 0 || count as usize > N {
            return Err(self.corrupt(field, format!("count {count} outside 0..={N}")));
        }
        let ids = slots[..count as usize].to_vec();
        BoundedIds::from_vec(ids).ok_or_else(|| self.corrupt(field, "list overflow".to_string()))
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn corrupt(&self, field: &'static str, message: String) -> crate::error::StorageError {
        FormatError::CorruptField {
            record: self.record,
            field,
            message,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_padding() {
        let mut buf = [0xFFu8; 8];
        let mut writer = FieldWriter::new(&mut buf);
        writer.put_str("name", "Ana", 8).unwrap();
        assert_eq!(&buf, b"Ana\0\0\0\0\0");

        let mut reader = FieldReader::new(&buf, "patient");
        assert_eq!(reader.str("name", 8).unwrap(), "Ana");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_text_field_needs_terminator() {
        let mut buf = [0u8; 4];
        let mut writer = FieldWriter::new(&mut buf);
        assert!(writer.put_str("code", "abc", 4).is_ok());

        let mut buf = [0u8; 4];
        let mut writer = FieldWriter::new(&mut buf);
        let err = writer.put_str("code", "abcd", 4).unwrap_err();
        assert!(err.to_string().contains("maximum is 3"));
    }

    #[test]
    fn test_id_list_fills_sentinels() {
        let mut ids = BoundedIds::<3>::new();
        ids.try_push(7).unwrap();

        let mut buf = [0u8; 16];
        FieldWriter::new(&mut buf).put_ids(&ids);
        assert_eq!(&buf[0..4], &1i32.to_le_bytes());
        assert_eq!(&buf[4..8], &7i32.to_le_bytes());
        assert_eq!(&buf[8..12], &(-1i32).to_le_bytes());
        assert_eq!(&buf[12..16], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_id_list_rejects_bad_count() {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&9i32.to_le_bytes());
        let mut reader = FieldReader::new(&buf, "doctor");
        assert!(reader.ids::<3>("patients").is_err());
    }
}
