// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Forest-web3 handles every JSON-RPC method as a type implementing [`RpcMethod`].
//!
//! Each method declares its name, the names of its parameters and their Rust types. Registration
//! and argument parsing are shared, so a handler only ever sees well-typed arguments:
//! - positional (`[a, b]`) and by-name (`{"a": .., "b": ..}`) calls are both accepted,
//! - trailing parameters may be left out, they are parsed from `null`,
//! - surplus or unknown parameters are rejected.

use std::future::Future;
use std::sync::Arc;

use jsonrpsee::RpcModule;
use jsonrpsee::core::RegisterMethodError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RPCState;
use super::error::ServerError;

pub type Ctx = Arc<RPCState>;

/// A JSON-RPC method taking `ARITY` parameters.
pub trait RpcMethod<const ARITY: usize> {
    /// Method name, e.g. `eth_blockNumber`.
    const NAME: &'static str;
    /// Parameter names, in position order.
    const PARAM_NAMES: [&'static str; ARITY];
    /// Types of the parameters, as a tuple.
    type Params: Params<ARITY>;
    /// Return type of the method.
    type Ok: Serialize;

    fn handle(
        ctx: Ctx,
        params: Self::Params,
    ) -> impl Future<Output = Result<Self::Ok, ServerError>> + Send;
}

/// Registration and parsing shared by every [`RpcMethod`].
pub trait RpcMethodExt<const ARITY: usize>: RpcMethod<ARITY> {
    /// Parses the raw parameter text of a request.
    fn parse_params(raw: Option<&str>) -> Result<Self::Params, ServerError> {
        let values = arrange(Self::NAME, raw, &Self::PARAM_NAMES)?;
        Self::Params::parse(Self::NAME, &Self::PARAM_NAMES, values)
    }

    /// Parses `raw` and runs the handler.
    fn call_raw(
        ctx: Ctx,
        raw: Option<&str>,
    ) -> impl Future<Output = Result<Value, ServerError>> + Send
    where
        Self::Params: Send,
    {
        let params = Self::parse_params(raw);
        async move {
            let ok = Self::handle(ctx, params?).await?;
            Ok(serde_json::to_value(ok)?)
        }
    }

    fn register(module: &mut RpcModule<RPCState>) -> Result<(), RegisterMethodError>
    where
        Self: 'static,
        Self::Params: Send + 'static,
    {
        module.register_async_method(Self::NAME, |params, ctx, _extensions| async move {
            Self::call_raw(ctx, params.as_str()).await
        })?;
        Ok(())
    }
}

impl<const ARITY: usize, T> RpcMethodExt<ARITY> for T where T: RpcMethod<ARITY> {}

/// Lays the request parameters out in position order, padding missing ones with `null`.
fn arrange<const ARITY: usize>(
    method: &str,
    raw: Option<&str>,
    names: &[&'static str; ARITY],
) -> Result<[Value; ARITY], ServerError> {
    let mut slots: [Value; ARITY] = std::array::from_fn(|_| Value::Null);
    let params = match raw {
        None => Value::Null,
        Some(raw) => serde_json::from_str(raw).map_err(|e| ServerError::parse_error(e, None))?,
    };
    match params {
        Value::Null => {}
        Value::Array(values) => {
            if values.len() > ARITY {
                return Err(ServerError::invalid_params(
                    format!(
                        "{method} takes at most {ARITY} parameters, got {}",
                        values.len()
                    ),
                    None,
                ));
            }
            for (slot, value) in slots.iter_mut().zip(values) {
                *slot = value;
            }
        }
        Value::Object(mut values) => {
            for (slot, name) in slots.iter_mut().zip(names) {
                if let Some(value) = values.remove(*name) {
                    *slot = value;
                }
            }
            if let Some(unexpected) = values.keys().next() {
                return Err(ServerError::invalid_params(
                    format!("{method} has no parameter named {unexpected:?}"),
                    None,
                ));
            }
        }
        _ => {
            return Err(ServerError::invalid_params(
                format!("{method} expects its parameters as an array or an object"),
                None,
            ));
        }
    }
    Ok(slots)
}

fn parse_one<T: DeserializeOwned>(
    method: &str,
    name: &str,
    index: usize,
    value: Value,
) -> Result<T, ServerError> {
    let missing = value.is_null();
    serde_json::from_value(value).map_err(|e| {
        let message = match missing {
            true => format!("{method}: missing parameter #{index} `{name}`"),
            false => format!("{method}: invalid parameter #{index} `{name}`: {e}"),
        };
        ServerError::invalid_params(
            message,
            Some(Value::String(std::any::type_name::<T>().to_owned())),
        )
    })
}

/// Tuples of deserializable types, one per parameter.
pub trait Params<const ARITY: usize>: Sized {
    fn parse(
        method: &str,
        names: &[&'static str; ARITY],
        values: [Value; ARITY],
    ) -> Result<Self, ServerError>;
}

macro_rules! do_impls {
    ($arity:literal $(, $arg:ident $index:tt)* $(,)?) => {
        impl<$($arg,)*> Params<$arity> for ($($arg,)*)
        where
            $($arg: DeserializeOwned,)*
        {
            #[allow(unused_variables, unused_mut)]
            fn parse(
                method: &str,
                names: &[&'static str; $arity],
                values: [Value; $arity],
            ) -> Result<Self, ServerError> {
                let mut values = values.into_iter();
                Ok(($(
                    parse_one::<$arg>(method, names[$index], $index, values.next().unwrap_or_default())?,
                )*))
            }
        }
    };
}

do_impls!(0);
do_impls!(1, T0 0);
do_impls!(2, T0 0, T1 1);
do_impls!(3, T0 0, T1 1, T2 2);
do_impls!(4, T0 0, T1 1, T2 2, T3 3);
