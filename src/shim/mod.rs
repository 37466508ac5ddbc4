// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod actors;
pub mod address;
pub mod executor;
pub mod message;

pub mod clock {
    pub use fvm_shared4::clock::ChainEpoch;
}

pub mod crypto {
    pub use fvm_shared4::crypto::signature::{Signature, SignatureType};
}

pub mod econ {
    pub use fvm_shared4::econ::TokenAmount;
}

pub mod error {
    pub use fvm_shared4::error::ExitCode;
}
