// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing codec (C1): header (de)serialization and message-type peeking.
//! The outer length-prefix/magic framing lives in [`codec`]; this module
//! covers the header/body layer described in spec §4.1.

pub mod codec;
pub mod serialize;

use crate::error::DataError;
use crate::proto::CMsgProtoBufHeader;
use crate::wire::message::{
    Header, Message, MessageType, EXTENDED_HEADER_CANARY, EXTENDED_HEADER_SIZE,
    EXTENDED_HEADER_VERSION,
};
use crate::wire::serialize::{Deserializer, Serializer};

pub mod message;

/// Peeks the first 32-bit word of a packet body and returns its message
/// type, stripped of the protobuf flag. Never mutates the input.
pub fn peek_message_type(body: &[u8]) -> Result<MessageType, DataError> {
    let mut de = Deserializer::new(body);
    let word = de.get_u32()?;
    let (ty, _has_proto) = MessageType::from_wire(word);
    Ok(ty)
}

/// Decodes a full packet body into a `Message`. Which header variant is
/// read is chosen by the protobuf flag on the type word; for unflagged
/// types, [`MessageType::uses_simple_header`] picks Simple vs Extended.
pub fn decode_message(body: &[u8]) -> Result<Message, DataError> {
    let mut de = Deserializer::new(body);
    let word = de.get_u32()?;
    let (msg_type, has_proto) = MessageType::from_wire(word);

    let header = if has_proto {
        let proto_len = de.get_u32()? as usize;
        let proto: CMsgProtoBufHeader = de.get_proto(proto_len)?;
        Header::ProtoBuf(proto)
    } else if msg_type.uses_simple_header() {
        let target_job_id = de.get_u64()?;
        let source_job_id = de.get_u64()?;
        Header::Simple {
            target_job_id,
            source_job_id,
        }
    } else {
        let header_size = de.get_u8()?;
        let version = de.get_u16()?;
        let target_job_id = de.get_u64()?;
        let source_job_id = de.get_u64()?;
        let canary = de.get_u8()?;
        let steam_id = de.get_u64()?;
        let session_id = de.get_u32()?;
        if header_size != EXTENDED_HEADER_SIZE
            || version != EXTENDED_HEADER_VERSION
            || canary != EXTENDED_HEADER_CANARY
        {
            tracing::debug!(
                header_size,
                version,
                canary,
                "extended header with unexpected constant; accepting anyway"
            );
        }
        Header::Extended {
            target_job_id,
            source_job_id,
            steam_id,
            session_id,
        }
    };

    let remaining = de.remaining();
    let body_bytes = de.get_bytes(remaining)?.to_vec();
    Ok(Message {
        msg_type,
        header,
        body: body_bytes,
    })
}

/// Encodes a `Message` back into its packet body. `serialize(decode(b)) ==
/// b` for any well-formed `b` (§8 invariant 1).
pub fn encode_message(msg: &Message) -> Vec<u8> {
    let mut ser = Serializer::new();
    match &msg.header {
        Header::Simple {
            target_job_id,
            source_job_id,
        } => {
            ser.store_u32(msg.msg_type.to_wire(false));
            ser.store_u64(*target_job_id);
            ser.store_u64(*source_job_id);
        }
        Header::Extended {
            target_job_id,
            source_job_id,
            steam_id,
            session_id,
        } => {
            ser.store_u32(msg.msg_type.to_wire(false));
            ser.store_u8(EXTENDED_HEADER_SIZE);
            ser.store_u16(EXTENDED_HEADER_VERSION);
            ser.store_u64(*target_job_id);
            ser.store_u64(*source_job_id);
            ser.store_u8(EXTENDED_HEADER_CANARY);
            ser.store_u64(*steam_id);
            ser.store_u32(*session_id);
        }
        Header::ProtoBuf(proto) => {
            ser.store_u32(msg.msg_type.to_wire(true));
            let encoded = {
                let mut tmp = Serializer::new();
                tmp.store_proto(proto);
                tmp.into_bytes()
            };
            ser.store_u32(encoded.len() as u32);
            ser.store_bytes(&encoded);
        }
    }
    ser.store_bytes(&msg.body);
    ser.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_header_is_20_bytes() {
        let msg = Message {
            msg_type: MessageType::ClientLoggedOff,
            header: Header::Simple {
                target_job_id: 1,
                source_job_id: 2,
            },
            body: vec![],
        };
        let bytes = encode_message(&msg);
        assert_eq!(bytes.len(), 20);
    }

    #[test]
    fn extended_header_is_36_bytes() {
        let msg = Message {
            msg_type: MessageType::Other(9999),
            header: Header::Extended {
                target_job_id: 1,
                source_job_id: 2,
                steam_id: 3,
                session_id: 4,
            },
            body: vec![],
        };
        let bytes = encode_message(&msg);
        assert_eq!(bytes.len(), 36);
    }

    #[test]
    fn round_trips_simple_header() {
        let msg = Message {
            msg_type: MessageType::ClientLoggedOff,
            header: Header::Simple {
                target_job_id: 11,
                source_job_id: 22,
            },
            body: vec![1, 2, 3],
        };
        let bytes = encode_message(&msg);
        let decoded = decode_message(&bytes).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trips_protobuf_header() {
        let msg = Message {
            msg_type: MessageType::ClientHeartBeat,
            header: Header::ProtoBuf(CMsgProtoBufHeader {
                jobid_source: 7,
                ..Default::default()
            }),
            body: vec![9, 9],
        };
        let bytes = encode_message(&msg);
        let decoded = decode_message(&bytes).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn peek_never_mutates_and_strips_flag() {
        let msg = Message {
            msg_type: MessageType::ClientHello,
            header: Header::ProtoBuf(CMsgProtoBufHeader::default()),
            body: vec![],
        };
        let bytes = encode_message(&msg);
        let ty = peek_message_type(&bytes).expect("peek");
        assert_eq!(ty, MessageType::ClientHello);
    }

    #[test]
    fn peek_fails_below_four_bytes() {
        assert!(matches!(
            peek_message_type(&[1, 2, 3]),
            Err(DataError::NotEnoughData { .. })
        ));
    }
}
