// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Little-endian primitive (de)serialization, grounded on the original
//! `Serializer`/`Deserializer` pair: an append-only byte buffer on the way
//! out, a byte-span cursor on the way in.

use crate::error::DataError;
use prost::Message as _;

/// An append-only byte buffer. Every `store_*` call returns the cumulative
/// byte count written so far.
#[derive(Debug, Default)]
pub struct Serializer {
    buf: Vec<u8>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> usize {
        self.buf.extend_from_slice(bytes);
        self.buf.len()
    }

    pub fn store_u8(&mut self, v: u8) -> usize {
        self.store_bytes(&v.to_le_bytes())
    }

    pub fn store_u16(&mut self, v: u16) -> usize {
        self.store_bytes(&v.to_le_bytes())
    }

    pub fn store_u32(&mut self, v: u32) -> usize {
        self.store_bytes(&v.to_le_bytes())
    }

    pub fn store_u64(&mut self, v: u64) -> usize {
        self.store_bytes(&v.to_le_bytes())
    }

    pub fn store_proto<M: prost::Message>(&mut self, msg: &M) -> usize {
        let encoded = msg.encode_to_vec();
        self.store_bytes(&encoded)
    }
}

/// A byte-span cursor. `get_*` calls fail with `NotEnoughData` rather than
/// panicking when the remaining span is shorter than requested.
#[derive(Debug, Clone, Copy)]
pub struct Deserializer<'a> {
    data: &'a [u8],
}

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn remaining_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn get_bytes(&mut self, size: usize) -> Result<&'a [u8], DataError> {
        if self.data.len() < size {
            return Err(DataError::NotEnoughData {
                needed: size,
                available: self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(size);
        self.data = tail;
        Ok(head)
    }

    pub fn get_u8(&mut self) -> Result<u8, DataError> {
        let b = self.get_bytes(1)?;
        Ok(b[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, DataError> {
        let b = self.get_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> Result<u32, DataError> {
        let b = self.get_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_u64(&mut self) -> Result<u64, DataError> {
        let b = self.get_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn get_proto<M: prost::Message + Default>(&mut self, size: usize) -> Result<M, DataError> {
        let bytes = self.get_bytes(size)?;
        Ok(M::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_integers() {
        let mut ser = Serializer::new();
        ser.store_u32(0xDEAD_BEEF);
        ser.store_u64(0x0102_0304_0506_0708);
        let bytes = ser.into_bytes();
        let mut de = Deserializer::new(&bytes);
        assert_eq!(de.get_u32().expect("u32"), 0xDEAD_BEEF);
        assert_eq!(de.get_u64().expect("u64"), 0x0102_0304_0506_0708);
    }

    #[test]
    fn not_enough_data_on_truncation() {
        let mut de = Deserializer::new(&[1, 2]);
        assert!(matches!(
            de.get_u32(),
            Err(DataError::NotEnoughData {
                needed: 4,
                available: 2
            })
        ));
    }
}
