// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Algorithm error: {0}")]
    Algorithm(#[from] crate::algorithms::AlgorithmError),

    #[error("Policy codec error: {0}")]
    Policy(#[from] crate::policy::PolicyError),

    #[error("Emitter error: {0}")]
    Emitter(#[from] crate::emitter::EmitterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
