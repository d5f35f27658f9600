//! ESDT supply aggregation.
//!
//! Each shard only knows the supply delta it minted or burned locally. The
//! total is the sum over every shard plus, for fungible tokens, the initial
//! supply recorded by the ESDT system contract on the metachain. A single
//! missing or malformed part fails the whole request.

use crate::domain::{EsdtSupply, ProxyError, ProxyResult, ScQuery};
use crate::process::base::{BaseProcessor, Dispatch};
use crate::process::sc_query::{return_data_item, vm_output, ScQueryProcessor};
use csim_sharding::shard_display;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// ESDT system smart contract
pub const ESDT_SYSTEM_SC_ADDRESS: &str =
    "000000000000000000010000000000000000000000000000000000000002ffff";

const TOKEN_PROPERTIES_FUNCTION: &str = "getTokenProperties";
const INITIAL_SUPPLY_INDEX: usize = 3;
const OPERATION: &str = "esdt supply";

pub struct EsdtSupplyProcessor {
    base: Arc<BaseProcessor>,
    sc_query: Arc<ScQueryProcessor>,
}

impl Dispatch for EsdtSupplyProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SupplyTotals {
    supply: i128,
    minted: i128,
    burned: i128,
}

impl EsdtSupplyProcessor {
    pub fn new(base: Arc<BaseProcessor>, sc_query: Arc<ScQueryProcessor>) -> Self {
        Self { base, sc_query }
    }

    #[instrument(skip(self))]
    pub async fn get_esdt_supply(&self, token: &str) -> ProxyResult<EsdtSupply> {
        if token.is_empty() || token.contains('/') {
            return Err(ProxyError::BadRequest(format!("invalid token `{}`", token)));
        }

        let totals = self.sum_shard_supplies(token).await?;
        let initial = if is_fungible(token) {
            self.initial_supply(token).await?
        } else {
            0
        };

        let supply = totals
            .supply
            .checked_add(initial)
            .ok_or_else(|| ProxyError::aggregation(OPERATION, "supply overflow"))?;

        Ok(EsdtSupply {
            supply: supply.to_string(),
            minted: totals.minted.to_string(),
            burned: totals.burned.to_string(),
            initial_minted: initial.to_string(),
        })
    }

    async fn sum_shard_supplies(&self, token: &str) -> ProxyResult<SupplyTotals> {
        let path = format!("/network/esdt/supply/{}", token);
        let replies = self
            .get_all(&path)
            .await
            .map_err(|e| ProxyError::aggregation(OPERATION, e))?;

        let mut totals = SupplyTotals::default();
        for (shard, reply) in replies {
            let data = reply.data();
            let read = |key: &str| -> ProxyResult<i128> {
                parse_amount(data.get(key)).ok_or_else(|| {
                    ProxyError::aggregation(
                        OPERATION,
                        format!("shard {} returned invalid `{}`", shard_display(shard), key),
                    )
                })
            };

            totals.supply = checked_sum(totals.supply, read("supply")?)?;
            totals.minted = checked_sum(totals.minted, read("minted")?)?;
            totals.burned = checked_sum(totals.burned, read("burned")?)?;
        }
        Ok(totals)
    }

    async fn initial_supply(&self, token: &str) -> ProxyResult<i128> {
        let query = ScQuery {
            sc_address: ESDT_SYSTEM_SC_ADDRESS.to_string(),
            func_name: TOKEN_PROPERTIES_FUNCTION.to_string(),
            args: vec![hex::encode(token)],
            ..Default::default()
        };

        let data = self
            .sc_query
            .execute_query(&query)
            .await
            .map_err(|e| ProxyError::aggregation(OPERATION, e))?;
        let output = vm_output(&data);

        if let Some(code) = output.get("returnCode").and_then(Value::as_str) {
            if code != "ok" {
                return Err(ProxyError::aggregation(
                    OPERATION,
                    format!("token properties query returned `{}`", code),
                ));
            }
        }

        let raw = return_data_item(output, INITIAL_SUPPLY_INDEX)?.ok_or_else(|| {
            ProxyError::aggregation(OPERATION, "token properties without initial supply")
        })?;
        String::from_utf8_lossy(&raw)
            .parse::<i128>()
            .map_err(|e| ProxyError::aggregation(OPERATION, format!("initial supply: {}", e)))
    }
}

/// `TICKER-random` is fungible; NFT and SFT identifiers carry a nonce suffix
fn is_fungible(token: &str) -> bool {
    token.split('-').count() == 2
}

fn parse_amount(value: Option<&Value>) -> Option<i128> {
    match value? {
        Value::String(text) if text.is_empty() => Some(0),
        Value::String(text) => text.parse().ok(),
        Value::Number(number) => number.as_i64().map(i128::from),
        Value::Null => Some(0),
        _ => None,
    }
}

fn checked_sum(total: i128, amount: i128) -> ProxyResult<i128> {
    total
        .checked_add(amount)
        .ok_or_else(|| ProxyError::aggregation(OPERATION, "amount overflow"))
}
