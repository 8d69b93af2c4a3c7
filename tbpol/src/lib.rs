// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

pub mod algorithms;
pub mod catalog;
pub mod emitter;
pub mod error;
pub mod policy;

#[macro_use]
extern crate static_assertions;
