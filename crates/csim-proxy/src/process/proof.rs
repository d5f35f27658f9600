//! Merkle proofs for account state.

use crate::domain::{ProxyError, ProxyResult};
use crate::observer::DataAvailability;
use crate::process::base::{BaseProcessor, Dispatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Body of a proof verification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyProofRequest {
    pub root_hash: String,
    pub address: String,
    pub proof: Vec<String>,
}

pub struct ProofProcessor {
    base: Arc<BaseProcessor>,
}

impl Dispatch for ProofProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl ProofProcessor {
    pub fn new(base: Arc<BaseProcessor>) -> Self {
        Self { base }
    }

    pub async fn get_proof(&self, root_hash: &str, address: &str) -> ProxyResult<Value> {
        check_hash(root_hash)?;
        let shard = self.base.shard_id_for_address(address)?;
        let path = format!("/proof/root-hash/{}/address/{}", root_hash, address);
        let reply = self
            .base
            .call_get_with_availability(shard, &path, DataAvailability::AllHistory)
            .await?;
        Ok(reply.into_data())
    }

    pub async fn get_proof_current_root_hash(&self, address: &str) -> ProxyResult<Value> {
        let shard = self.base.shard_id_for_address(address)?;
        let reply = self.get(shard, &format!("/proof/address/{}", address)).await?;
        Ok(reply.into_data())
    }

    pub async fn verify_proof(&self, request: &VerifyProofRequest) -> ProxyResult<Value> {
        check_hash(&request.root_hash)?;
        if request.proof.is_empty() {
            return Err(ProxyError::BadRequest("empty proof".into()));
        }
        let shard = self.base.shard_id_for_address(&request.address)?;
        let body = serde_json::to_value(request).map_err(|e| ProxyError::BadRequest(e.to_string()))?;
        let reply = self.post(shard, "/proof/verify", &body).await?;
        Ok(reply.into_data())
    }
}

fn check_hash(hash: &str) -> ProxyResult<()> {
    match hex::decode(hash) {
        Ok(bytes) if !bytes.is_empty() => Ok(()),
        _ => Err(ProxyError::BadRequest(format!("invalid root hash `{}`", hash))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{address_in_shard, base_processor, ok, MockObserverClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_proof_routed_by_address() {
        let client = MockObserverClient::new();
        client.on("http://s1-0/proof/", ok(json!({"proof": ["aa"]})));
        let processor = ProofProcessor::new(base_processor(&client, 2, 1));

        let address = address_in_shard(1);
        let data = processor.get_proof("abcd", &address).await.unwrap();
        assert_eq!(data["proof"][0], "aa");
        assert_eq!(
            client.calls(),
            vec![format!("GET http://s1-0/proof/root-hash/abcd/address/{}", address)]
        );
    }

    #[tokio::test]
    async fn test_verify_proof() {
        let client = MockObserverClient::new();
        client.on("http://s0-0/proof/verify", ok(json!({"ok": true})));
        let processor = ProofProcessor::new(base_processor(&client, 2, 1));

        let mut request = VerifyProofRequest {
            root_hash: "abcd".into(),
            address: address_in_shard(0),
            proof: vec!["01".into()],
        };
        assert_eq!(processor.verify_proof(&request).await.unwrap()["ok"], true);
        assert_eq!(client.posted_bodies()[0].1["rootHash"], "abcd");

        request.proof.clear();
        assert!(matches!(
            processor.verify_proof(&request).await,
            Err(ProxyError::BadRequest(_))
        ));
    }
}
