// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generated protobuf message types (see `build.rs` / `proto/steammessages.proto`).

include!(concat!(env!("OUT_DIR"), "/steammessages.rs"));
