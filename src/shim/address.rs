// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use ethereum_types::H160;
pub use fvm_shared4::address::{Address, Network, Payload, Protocol};
use fvm_shared4::ActorID;

/// Namespace of the Ethereum Address Manager; delegated addresses in this namespace wrap a
/// 20-byte Ethereum-style address.
pub const EAM_NAMESPACE: ActorID = 10;

/// ID addresses are exposed to Ethereum tooling as `0xff` followed by eleven zero bytes and the
/// big-endian actor ID.
const MASKED_ID_PREFIX: [u8; 12] = [0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Parses either a native `f…`/`t…` address string or a `0x`-prefixed 20-byte address.
pub fn parse_address(s: &str) -> anyhow::Result<Address> {
    let s = s.trim();
    if let Some(hex_str) = s.strip_prefix("0x") {
        let bytes = hex::decode(hex_str).with_context(|| format!("invalid hex in {s}"))?;
        anyhow::ensure!(
            bytes.len() == H160::len_bytes(),
            "expected a 20-byte address, got {} bytes",
            bytes.len()
        );
        return from_eth_address(&H160::from_slice(&bytes));
    }
    Network::Testnet
        .parse_address(s)
        .or_else(|_| Network::Mainnet.parse_address(s))
        .with_context(|| format!("invalid address {s}"))
}

/// Maps a 20-byte address onto the native address space.
pub fn from_eth_address(addr: &H160) -> anyhow::Result<Address> {
    let bytes = addr.as_bytes();
    if bytes[..12] == MASKED_ID_PREFIX {
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[12..]);
        return Ok(Address::new_id(u64::from_be_bytes(id)));
    }
    Ok(Address::new_delegated(EAM_NAMESPACE, bytes)?)
}

/// The 20-byte view of a native address, when one exists.
pub fn to_eth_address(addr: &Address) -> Option<H160> {
    match addr.payload() {
        Payload::ID(id) => {
            let mut bytes = [0u8; 20];
            bytes[..12].copy_from_slice(&MASKED_ID_PREFIX);
            bytes[12..].copy_from_slice(&id.to_be_bytes());
            Some(H160::from(bytes))
        }
        Payload::Delegated(delegated)
            if delegated.namespace() == EAM_NAMESPACE && delegated.subaddress().len() == 20 =>
        {
            Some(H160::from_slice(delegated.subaddress()))
        }
        _ => None,
    }
}
