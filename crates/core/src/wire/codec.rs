// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outer packet framing (§4.2, §6.1): `length u32 LE` ∥ `"VT01"` ∥ `body`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::DataError;

const MAGIC: &[u8; 4] = b"VT01";

/// A `tokio_util` codec for the TCP CM packet framing. Decodes to the raw
/// body bytes (header + payload, still undecoded); the framing codec (C1)
/// proper operates on that body via `Serializer`/`Deserializer`.
#[derive(Debug, Default)]
pub struct PacketCodec {
    state: DecodeState,
}

#[derive(Debug)]
enum DecodeState {
    Length,
    Body(usize),
}

impl Default for DecodeState {
    fn default() -> Self {
        DecodeState::Length
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = DataError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                DecodeState::Length => {
                    if src.len() < 4 + MAGIC.len() {
                        return Ok(None);
                    }
                    let length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
                    if &src[4..8] != MAGIC {
                        return Err(DataError::InvalidMagic);
                    }
                    src.advance(8);
                    self.state = DecodeState::Body(length);
                }
                DecodeState::Body(length) => {
                    if src.len() < length {
                        src.reserve(length - src.len());
                        return Ok(None);
                    }
                    let body = src.split_to(length).freeze();
                    self.state = DecodeState::Length;
                    return Ok(Some(body));
                }
            }
        }
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = DataError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(8 + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.put_slice(MAGIC);
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_framed_packet() {
        let mut codec = PacketCodec::default();
        let mut buf = BytesMut::new();
        buf.put_u32_le(3);
        buf.put_slice(MAGIC);
        buf.put_slice(b"abc");
        let decoded = codec.decode(&mut buf).expect("decode").expect("some");
        assert_eq!(&decoded[..], b"abc");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut codec = PacketCodec::default();
        let mut buf = BytesMut::new();
        buf.put_u32_le(3);
        buf.put_slice(b"XXXX");
        buf.put_slice(b"abc");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(DataError::InvalidMagic)
        ));
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut codec = PacketCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"hello world"), &mut buf)
            .expect("encode");
        let decoded = codec.decode(&mut buf).expect("decode").expect("some");
        assert_eq!(&decoded[..], b"hello world");
    }
}
