// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Log filter criteria: the wire shape accepted by `eth_newFilter`/`eth_getLogs`, its resolved
//! form, and the two-stage matcher (bloom prefilter, then exact per-log checks).

use ethereum_types::{BloomInput, H160, H256};
use serde::{Deserialize, Serialize};

use crate::rpc::methods::eth::errors::EthError;
use crate::rpc::methods::eth::quantity::{EARLIEST, HexString, LATEST, PENDING};
use crate::rpc::methods::eth::types::{EthLog, Hash};
use crate::shim::actors::contract::{EvmLog, LogsEntry};
use crate::shim::address::{parse_address, to_eth_address};
use crate::shim::clock::ChainEpoch;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(vec![])
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(t) => vec![t],
            Self::Many(v) => v,
        }
    }
}

/// Filter description as sent by clients.
///
/// A `null` topic position is a wildcard, as is an empty list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<String>,
    pub address: OneOrMany<String>,
    pub topics: Vec<Option<OneOrMany<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Hash>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub from_block: Option<ChainEpoch>,
    pub to_block: Option<ChainEpoch>,
    pub addresses: Vec<H160>,
    pub topics: Vec<Vec<H256>>,
    pub block_hash: Option<Hash>,
}

impl FilterSpec {
    /// Resolves tags against `head` and decodes addresses and topics.
    ///
    /// A missing lower bound (or `earliest`) leaves the range open downwards, a missing upper
    /// bound (or `latest`/`pending`) leaves it open upwards. A block hash suppresses both.
    pub fn into_criteria(self, head: ChainEpoch) -> Result<FilterCriteria, EthError> {
        let (from_block, to_block) = if self.block_hash.is_some() {
            (None, None)
        } else {
            (
                lower_bound(self.from_block.as_deref(), head)?,
                upper_bound(self.to_block.as_deref())?,
            )
        };
        let addresses = self
            .address
            .into_vec()
            .iter()
            .map(|a| parse_log_address(a))
            .collect::<Result<_, _>>()?;
        let topics = self
            .topics
            .into_iter()
            .map(|position| {
                position
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default()
                    .iter()
                    .map(|t| parse_topic(t))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;
        Ok(FilterCriteria {
            from_block,
            to_block,
            addresses,
            topics,
            block_hash: self.block_hash,
        })
    }
}

fn lower_bound(tag: Option<&str>, head: ChainEpoch) -> Result<Option<ChainEpoch>, EthError> {
    match tag {
        None | Some("") | Some(EARLIEST) => Ok(None),
        Some(LATEST) | Some(PENDING) => Ok(Some(head)),
        Some(q) => HexString::from(q).to_int().map(Some),
    }
}

fn upper_bound(tag: Option<&str>) -> Result<Option<ChainEpoch>, EthError> {
    match tag {
        None | Some("") | Some("0x") | Some(LATEST) | Some(PENDING) => Ok(None),
        Some(EARLIEST) => Ok(Some(0)),
        Some(q) => HexString::from(q).to_int().map(Some),
    }
}

/// Log addresses are the 20-byte form; native addresses are accepted when they have one.
fn parse_log_address(s: &str) -> Result<H160, EthError> {
    let invalid = || EthError::InvalidAddress(s.to_owned());
    if let Some(digits) = s.strip_prefix("0x") {
        let bytes = hex::decode(digits).map_err(|_| invalid())?;
        return (bytes.len() == H160::len_bytes())
            .then(|| H160::from_slice(&bytes))
            .ok_or_else(invalid);
    }
    parse_address(s)
        .ok()
        .as_ref()
        .and_then(to_eth_address)
        .ok_or_else(invalid)
}

fn parse_topic(s: &str) -> Result<H256, EthError> {
    let invalid = || EthError::InvalidHash(s.to_owned());
    let bytes = HexString::from(s).to_bytes().map_err(|_| invalid())?;
    (bytes.len() == H256::len_bytes())
        .then(|| H256::from_slice(&bytes))
        .ok_or_else(invalid)
}

impl FilterCriteria {
    /// Whether `height` lies within the bounds. Negative bounds count as unset.
    pub fn covers(&self, height: ChainEpoch) -> bool {
        if self.from_block.is_some_and(|from| from >= 0 && from > height) {
            return false;
        }
        if self.to_block.is_some_and(|to| to >= 0 && to < height) {
            return false;
        }
        true
    }

    fn accepts(&self, log: &EvmLog) -> bool {
        if !self.addresses.is_empty()
            && !self
                .addresses
                .iter()
                .any(|a| a.as_bytes() == log.address.as_slice())
        {
            return false;
        }
        if self.topics.len() > log.topics.len() {
            return false;
        }
        self.topics
            .iter()
            .zip(&log.topics)
            .all(|(allowed, topic)| {
                allowed.is_empty() || allowed.iter().any(|t| t.as_bytes() == topic.0.as_slice())
            })
    }
}

/// Cheap block-level rejection: `false` only if the bloom proves no log can match.
pub fn prefilter(bloom: &ethereum_types::Bloom, criteria: &FilterCriteria) -> bool {
    if !criteria.addresses.is_empty()
        && !criteria
            .addresses
            .iter()
            .any(|a| bloom.contains_input(BloomInput::Raw(a.as_bytes())))
    {
        return false;
    }
    criteria.topics.iter().all(|position| {
        position.is_empty()
            || position
                .iter()
                .any(|t| bloom.contains_input(BloomInput::Raw(t.as_bytes())))
    })
}

/// The logs recorded at `height` that satisfy `criteria`, in their original order.
pub fn match_logs(logs: &[EvmLog], height: ChainEpoch, criteria: &FilterCriteria) -> Vec<EthLog> {
    if !criteria.covers(height) {
        return vec![];
    }
    logs.iter()
        .enumerate()
        .filter(|(_, log)| criteria.accepts(log))
        .map(|(index, log)| EthLog::new(log, height, index))
        .collect()
}

/// Prefilters a height's logs on its bloom, then matches them exactly. Entries with a malformed
/// bloom skip the prefilter.
pub fn entry_logs(entry: &LogsEntry, criteria: &FilterCriteria) -> Vec<EthLog> {
    if let Some(bloom) = entry.bloom()
        && !prefilter(&bloom, criteria)
    {
        return vec![];
    }
    match_logs(&entry.logs, entry.height, criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::actors::contract::LogTopic;
    use quickcheck_macros::quickcheck;

    fn log(address: u8, topics: &[u8]) -> EvmLog {
        EvmLog {
            address: vec![address; 20],
            topics: topics.iter().map(|t| LogTopic(vec![*t; 32])).collect(),
            data: vec![address],
            removed: false,
        }
    }

    fn addr(b: u8) -> H160 {
        H160::repeat_byte(b)
    }

    fn topic(b: u8) -> H256 {
        H256::repeat_byte(b)
    }

    #[quickcheck]
    fn never_matches_outside_range(from: u8, to: u8, height: u8) -> bool {
        let criteria = FilterCriteria {
            from_block: Some(from.into()),
            to_block: Some(to.into()),
            ..Default::default()
        };
        let matched = match_logs(&[log(1, &[])], height.into(), &criteria);
        matched.is_empty() || (from <= height && height <= to)
    }

    #[quickcheck]
    fn never_matches_foreign_addresses(wanted: Vec<u8>, present: Vec<u8>) -> bool {
        let criteria = FilterCriteria {
            addresses: wanted.iter().copied().map(addr).collect(),
            ..Default::default()
        };
        let logs = present.iter().map(|a| log(*a, &[])).collect::<Vec<_>>();
        match_logs(&logs, 1, &criteria).iter().all(|l| {
            wanted.is_empty() || wanted.iter().any(|w| l.address.0 == vec![*w; 20])
        })
    }

    #[quickcheck]
    fn prefilter_has_no_false_negatives(addresses: Vec<u8>, topics: Vec<u8>, pick: u8) -> bool {
        let logs = addresses
            .iter()
            .map(|a| log(*a, &topics))
            .collect::<Vec<_>>();
        let entry = LogsEntry::new(3, logs);
        let criteria = FilterCriteria {
            addresses: vec![addr(pick)],
            topics: vec![topics.first().copied().map(topic).into_iter().collect()],
            ..Default::default()
        };
        let exact = match_logs(&entry.logs, entry.height, &criteria);
        exact.is_empty() || entry.bloom().is_some_and(|b| prefilter(&b, &criteria))
    }

    #[test]
    fn topic_positions_are_anded_and_members_ored() {
        let logs = vec![log(1, &[1, 2]), log(1, &[1, 3]), log(1, &[4]), log(1, &[])];
        let criteria = FilterCriteria {
            topics: vec![vec![topic(1), topic(4)], vec![topic(3)]],
            ..Default::default()
        };
        let matched = match_logs(&logs, 1, &criteria);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].log_index.0, 1);

        let wildcard_first = FilterCriteria {
            topics: vec![vec![], vec![topic(2)]],
            ..Default::default()
        };
        let matched = match_logs(&logs, 1, &wildcard_first);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].log_index.0, 0);
    }

    #[test]
    fn negative_bounds_are_ignored() {
        let criteria = FilterCriteria {
            from_block: Some(-1),
            to_block: Some(-1),
            ..Default::default()
        };
        assert!(criteria.covers(10));
    }

    #[test]
    fn bloom_rejects_absent_address() {
        let entry = LogsEntry::new(5, vec![log(0xaa, &[7])]);
        let hit = FilterCriteria {
            addresses: vec![addr(0xaa)],
            ..Default::default()
        };
        let miss = FilterCriteria {
            addresses: vec![addr(0xbb)],
            ..Default::default()
        };
        assert_eq!(entry_logs(&entry, &hit).len(), 1);
        assert!(entry_logs(&entry, &miss).is_empty());
    }

    #[test]
    fn malformed_bloom_skips_prefilter() {
        let mut entry = LogsEntry::new(5, vec![log(0xaa, &[])]);
        entry.logs_bloom = vec![0; 4];
        let criteria = FilterCriteria {
            addresses: vec![addr(0xaa)],
            ..Default::default()
        };
        assert_eq!(entry_logs(&entry, &criteria).len(), 1);
    }

    #[test]
    fn spec_resolution() {
        let spec: FilterSpec = serde_json::from_value(serde_json::json!({
            "fromBlock": "0x0",
            "toBlock": "0x28",
            "address": format!("0x{}", "aa".repeat(20)),
            "topics": [null, [format!("0x{}", "01".repeat(32))]],
        }))
        .unwrap();
        let criteria = spec.into_criteria(100).unwrap();
        assert_eq!(criteria.from_block, Some(0));
        assert_eq!(criteria.to_block, Some(40));
        assert_eq!(criteria.addresses, vec![addr(0xaa)]);
        assert_eq!(criteria.topics, vec![vec![], vec![topic(1)]]);

        let open = FilterSpec {
            from_block: Some(LATEST.into()),
            to_block: Some(LATEST.into()),
            ..Default::default()
        }
        .into_criteria(100)
        .unwrap();
        assert_eq!((open.from_block, open.to_block), (Some(100), None));
    }

    #[test]
    fn spec_rejects_bad_members() {
        let bad_address = FilterSpec {
            address: OneOrMany::One("0x1234".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_address.into_criteria(0),
            Err(EthError::InvalidAddress(_))
        ));
        let bad_topic = FilterSpec {
            topics: vec![Some(OneOrMany::One("0x01".into()))],
            ..Default::default()
        };
        assert!(matches!(
            bad_topic.into_criteria(0),
            Err(EthError::InvalidHash(_))
        ));
        let bad_range = FilterSpec {
            from_block: Some("ten".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_range.into_criteria(0),
            Err(EthError::MalformedQuantity(_))
        ));
    }
}
