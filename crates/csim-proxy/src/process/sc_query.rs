//! Smart contract queries, executed on the contract's shard.

use crate::domain::{ProxyError, ProxyResult, ScQuery};
use crate::process::base::{BaseProcessor, Dispatch};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub const VM_QUERY_PATH: &str = "/vm-values/query";

pub struct ScQueryProcessor {
    base: Arc<BaseProcessor>,
}

impl Dispatch for ScQueryProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl ScQueryProcessor {
    pub fn new(base: Arc<BaseProcessor>) -> Self {
        Self { base }
    }

    /// Run the query and return the observer's `data` (`{"data": VMOutput}`)
    #[instrument(skip_all, fields(contract = %query.sc_address, function = %query.func_name))]
    pub async fn execute_query(&self, query: &ScQuery) -> ProxyResult<Value> {
        if query.func_name.is_empty() {
            return Err(ProxyError::BadRequest("missing function name".into()));
        }
        for arg in &query.args {
            if hex::decode(arg).is_err() {
                return Err(ProxyError::BadRequest(format!("argument `{}` is not hex", arg)));
            }
        }

        let shard = self.base.shard_id_for_address(&query.sc_address)?;
        let body = serde_json::to_value(query).map_err(|e| ProxyError::BadRequest(e.to_string()))?;
        let reply = self.post(shard, VM_QUERY_PATH, &body).await?;
        Ok(reply.into_data())
    }

    /// First return value, raw bytes
    pub async fn first_return_value(&self, query: &ScQuery) -> ProxyResult<Vec<u8>> {
        let data = self.execute_query(query).await?;
        let output = vm_output(&data);
        return_data_item(output, 0)?
            .ok_or_else(|| ProxyError::BadRequest("query returned no data".into()))
    }

    pub async fn query_hex(&self, query: &ScQuery) -> ProxyResult<String> {
        Ok(hex::encode(self.first_return_value(query).await?))
    }

    pub async fn query_string(&self, query: &ScQuery) -> ProxyResult<String> {
        Ok(String::from_utf8_lossy(&self.first_return_value(query).await?).into_owned())
    }

    pub async fn query_int(&self, query: &ScQuery) -> ProxyResult<String> {
        Ok(unsigned_decimal(&self.first_return_value(query).await?))
    }
}

/// The VM output inside a query's `data`
pub fn vm_output(data: &Value) -> &Value {
    data.get("data").unwrap_or(data)
}

/// Base64-decoded `returnData[index]`; `Ok(None)` when out of range
pub fn return_data_item(output: &Value, index: usize) -> ProxyResult<Option<Vec<u8>>> {
    let items = match output.get("returnData") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(None),
        Some(_) => return Err(ProxyError::invalid_response("vm query", "`returnData` is not a list")),
    };

    match items.get(index) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(Vec::new())),
        Some(Value::String(encoded)) => STANDARD
            .decode(encoded)
            .map(Some)
            .map_err(|e| ProxyError::invalid_response("vm query", e)),
        Some(_) => Err(ProxyError::invalid_response("vm query", "return data is not base64")),
    }
}

/// Big-endian unsigned bytes as a decimal string
pub fn unsigned_decimal(bytes: &[u8]) -> String {
    // little-endian base 10 digits
    let mut digits: Vec<u8> = vec![0];
    for byte in bytes {
        let mut carry = u32::from(*byte);
        for digit in digits.iter_mut() {
            let value = u32::from(*digit) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}
