// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Steam message-type enum and the three header flavors (§3, §4.1, §6.1).

const PROTOBUF_FLAG: u32 = 0x8000_0000;

/// A Steam message type. The high bit of the on-wire type word (the
/// protobuf flag) is never part of this value; it is stripped on ingress
/// and re-applied on egress by the framing codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MessageType {
    Invalid,
    Multi,
    DestJobFailed,
    ServiceMethod,
    ServiceMethodResponse,
    ServiceMethodCallFromClient,
    ClientHeartBeat,
    ClientChangeStatus,
    ClientGamesPlayed,
    ClientLogOnResponse,
    ClientLoggedOff,
    ClientPersonaState,
    ClientFriendsList,
    ClientAccountInfo,
    ClientLicenseList,
    ClientLogon,
    ServiceMethodCallFromClientNonAuthed,
    ClientHello,
    ClientPicsProductInfoRequest,
    ClientPicsProductInfoResponse,
    Other(u32),
}

impl MessageType {
    /// Whether this type's body is always a protobuf (per §6.1's table).
    /// `ClientLoggedOff` is the one Simple-header exception in the listed
    /// subset.
    pub fn is_protobuf(self) -> bool {
        !matches!(self, MessageType::ClientLoggedOff)
    }

    /// Which non-protobuf header layout a type uses when the protobuf flag
    /// is absent. Only `ClientLoggedOff` is Simple in the subset this
    /// client knows about; anything else unflagged falls back to Extended.
    pub fn uses_simple_header(self) -> bool {
        matches!(self, MessageType::ClientLoggedOff)
    }

    pub fn code(self) -> u32 {
        match self {
            MessageType::Invalid => 0,
            MessageType::Multi => 1,
            MessageType::DestJobFailed => 113,
            MessageType::ServiceMethod => 146,
            MessageType::ServiceMethodResponse => 147,
            MessageType::ServiceMethodCallFromClient => 151,
            MessageType::ClientHeartBeat => 703,
            MessageType::ClientChangeStatus => 716,
            MessageType::ClientGamesPlayed => 742,
            MessageType::ClientLogOnResponse => 751,
            MessageType::ClientLoggedOff => 757,
            MessageType::ClientPersonaState => 766,
            MessageType::ClientFriendsList => 767,
            MessageType::ClientAccountInfo => 768,
            MessageType::ClientLicenseList => 780,
            MessageType::ClientLogon => 5514,
            MessageType::ServiceMethodCallFromClientNonAuthed => 9804,
            MessageType::ClientHello => 9805,
            MessageType::ClientPicsProductInfoRequest => 7039,
            MessageType::ClientPicsProductInfoResponse => 7040,
            MessageType::Other(c) => c,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => MessageType::Invalid,
            1 => MessageType::Multi,
            113 => MessageType::DestJobFailed,
            146 => MessageType::ServiceMethod,
            147 => MessageType::ServiceMethodResponse,
            151 => MessageType::ServiceMethodCallFromClient,
            703 => MessageType::ClientHeartBeat,
            716 => MessageType::ClientChangeStatus,
            742 => MessageType::ClientGamesPlayed,
            751 => MessageType::ClientLogOnResponse,
            757 => MessageType::ClientLoggedOff,
            766 => MessageType::ClientPersonaState,
            767 => MessageType::ClientFriendsList,
            768 => MessageType::ClientAccountInfo,
            780 => MessageType::ClientLicenseList,
            5514 => MessageType::ClientLogon,
            9804 => MessageType::ServiceMethodCallFromClientNonAuthed,
            9805 => MessageType::ClientHello,
            7039 => MessageType::ClientPicsProductInfoRequest,
            7040 => MessageType::ClientPicsProductInfoResponse,
            other => MessageType::Other(other),
        }
    }

    /// Strips the protobuf flag and decodes the bare type word, returning
    /// both the type and whether the protobuf flag was set.
    pub fn from_wire(word: u32) -> (Self, bool) {
        let has_proto = word & PROTOBUF_FLAG != 0;
        (Self::from_code(word & !PROTOBUF_FLAG), has_proto)
    }

    /// Re-applies the protobuf flag for egress.
    pub fn to_wire(self, protobuf: bool) -> u32 {
        if protobuf {
            self.code() | PROTOBUF_FLAG
        } else {
            self.code()
        }
    }
}

/// Which of the three header layouts a packet uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    Simple {
        target_job_id: u64,
        source_job_id: u64,
    },
    Extended {
        target_job_id: u64,
        source_job_id: u64,
        steam_id: u64,
        session_id: u32,
    },
    ProtoBuf(crate::proto::CMsgProtoBufHeader),
}

pub const EXTENDED_HEADER_SIZE: u8 = 36;
pub const EXTENDED_HEADER_VERSION: u16 = 2;
pub const EXTENDED_HEADER_CANARY: u8 = 0xEF;

/// A fully decoded `(type, header, body)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    pub header: Header,
    pub body: Vec<u8>,
}

impl Message {
    pub fn is_protobuf(&self) -> bool {
        matches!(self.header, Header::ProtoBuf(_))
    }
}
