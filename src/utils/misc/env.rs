// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::str::FromStr;

/// Reads `key` from the environment, falling back to `default` when unset or unparsable.
pub fn env_or_default<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring unparsable value {value:?} of {key}");
            default
        }),
        Err(_) => default,
    }
}

/// `1`, `true` and `yes` (any case) count as truthy.
pub fn is_env_truthy(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
