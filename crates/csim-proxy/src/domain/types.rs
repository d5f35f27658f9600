//! Wire types shared by the HTTP surface, the processors and the simulator
//! handle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Envelope code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCode {
    Successful,
    InternalIssue,
    BadRequest,
}

impl ReturnCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::InternalIssue => "internal_issue",
            Self::BadRequest => "bad_request",
        }
    }
}

/// Uniform response envelope, used both by the proxy and by observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: String,
    pub code: ReturnCode,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: String::new(),
            code: ReturnCode::Successful,
        }
    }
}

impl ResponseEnvelope<Value> {
    pub fn failure(error: impl Into<String>, code: ReturnCode) -> Self {
        Self {
            data: None,
            error: error.into(),
            code,
        }
    }

    /// Empty success payload (`{}`)
    pub fn empty() -> Self {
        Self::success(Value::Object(Map::new()))
    }
}

/// Account state written through the simulator handle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressState {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,
    /// Code, code metadata, owner and other fields passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One pre-funded wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletKey {
    pub address: String,
    pub private_key_hex: String,
}

/// Wallets created at simulator genesis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialWalletKeys {
    pub stake_wallets: Vec<WalletKey>,
    pub balance_wallets: BTreeMap<u32, WalletKey>,
}

/// Body of `POST /simulator/add-keys`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorKeys {
    pub private_keys_base64: Vec<String>,
}

/// Observer REST port exposed for one shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverInfo {
    pub api_port: u16,
}

/// Smart contract query, as accepted by `/vm-values/query`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScQuery {
    pub sc_address: String,
    pub func_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Hex encoded arguments
    #[serde(default)]
    pub args: Vec<String>,
}

/// Aggregated ESDT supply, decimal strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsdtSupply {
    pub supply: String,
    pub minted: String,
    pub burned: String,
    pub initial_minted: String,
}

/// Transaction as submitted by clients. Only the sender matters for routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Block coordinates for historical account queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQueryOptions {
    pub on_final_block: Option<bool>,
    pub block_nonce: Option<u64>,
    pub block_hash: Option<String>,
}

impl AccountQueryOptions {
    /// Whether the query needs a full-history node
    pub fn is_historical(&self) -> bool {
        self.block_nonce.is_some() || self.block_hash.is_some()
    }

    /// Query string, empty or starting with `?`
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if self.on_final_block == Some(true) {
            params.push("onFinalBlock=true".to_string());
        }
        if let Some(nonce) = self.block_nonce {
            params.push(format!("blockNonce={}", nonce));
        }
        if let Some(hash) = &self.block_hash {
            params.push(format!("blockHash={}", hash));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ResponseEnvelope::empty()).unwrap();
        assert_eq!(body, json!({"data": {}, "error": "", "code": "successful"}));

        let body = serde_json::to_value(ResponseEnvelope::failure(
            "cannot generate blocks",
            ReturnCode::InternalIssue,
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({"data": null, "error": "cannot generate blocks", "code": "internal_issue"})
        );
    }

    #[test]
    fn test_address_state_keeps_unknown_fields() {
        let state: AddressState = serde_json::from_value(json!({
            "address": "aa",
            "balance": "10",
            "codeMetadata": "0500",
        }))
        .unwrap();
        assert_eq!(state.balance.as_deref(), Some("10"));
        assert_eq!(state.extra.get("codeMetadata"), Some(&json!("0500")));
    }

    #[test]
    fn test_query_string() {
        assert_eq!(AccountQueryOptions::default().to_query_string(), "");

        let options = AccountQueryOptions {
            on_final_block: Some(true),
            block_nonce: Some(7),
            block_hash: None,
        };
        assert!(options.is_historical());
        assert_eq!(options.to_query_string(), "?onFinalBlock=true&blockNonce=7");
    }

    #[test]
    fn test_validator_keys_field_name() {
        let keys: ValidatorKeys =
            serde_json::from_value(json!({"privateKeysBase64": ["YWI="]})).unwrap();
        assert_eq!(keys.private_keys_base64, vec!["YWI=".to_string()]);
    }
}
