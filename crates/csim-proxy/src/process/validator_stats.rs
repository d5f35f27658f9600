//! Validator statistics, cached from the metachain.

use crate::cache::{CachedResource, Fetcher};
use crate::domain::ProxyResult;
use crate::process::base::{BaseProcessor, Dispatch};
use async_trait::async_trait;
use csim_sharding::METACHAIN_SHARD_ID;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const VALIDATOR_STATISTICS_PATH: &str = "/validator/statistics";
pub const AUCTION_LIST_PATH: &str = "/validator/auction";

pub struct ValidatorStatisticsFetcher {
    base: Arc<BaseProcessor>,
}

#[async_trait]
impl Fetcher<Value> for ValidatorStatisticsFetcher {
    async fn fetch(&self) -> ProxyResult<Value> {
        let reply = self
            .base
            .call_get_rest_end_point(METACHAIN_SHARD_ID, VALIDATOR_STATISTICS_PATH)
            .await?;
        let statistics = reply.data_field("statistics")?.clone();
        Ok(json!({ "statistics": statistics }))
    }
}

pub struct ValidatorStatisticsProcessor {
    base: Arc<BaseProcessor>,
    statistics: Arc<CachedResource<Value>>,
}

impl Dispatch for ValidatorStatisticsProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl ValidatorStatisticsProcessor {
    pub fn new(base: Arc<BaseProcessor>, validity: Duration) -> Self {
        let fetcher = Arc::new(ValidatorStatisticsFetcher {
            base: Arc::clone(&base),
        });
        Self {
            base,
            statistics: Arc::new(CachedResource::new(
                "validator statistics",
                validity,
                fetcher,
            )),
        }
    }

    pub async fn get_validator_statistics(&self) -> ProxyResult<Value> {
        self.statistics.get().await
    }

    /// Refetch now; the fetch error is returned to the caller
    pub async fn force_update(&self) -> ProxyResult<Value> {
        self.statistics.force_update().await
    }

    /// Auction list, never cached
    pub async fn get_auction_list(&self) -> ProxyResult<Value> {
        let reply = self.get(METACHAIN_SHARD_ID, AUCTION_LIST_PATH).await?;
        Ok(reply.into_data())
    }

    pub fn cache(&self) -> &Arc<CachedResource<Value>> {
        &self.statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProxyError;
    use crate::test_support::{base_processor, ok, MockObserverClient, MockReply};

    #[tokio::test]
    async fn test_statistics_cached() {
        let client = MockObserverClient::new();
        client.on("http://meta-0/validator/statistics", ok(json!({"statistics": {"k1": {"rating": 50}}})));
        let processor = ValidatorStatisticsProcessor::new(base_processor(&client, 2, 1), Duration::from_secs(60));

        let data = processor.get_validator_statistics().await.unwrap();
        assert_eq!(data["statistics"]["k1"]["rating"], 50);
        processor.get_validator_statistics().await.unwrap();
        assert_eq!(client.calls().len(), 1);

        processor.force_update().await.unwrap();
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_force_update_error_surfaces() {
        let client = MockObserverClient::new();
        client.on("http://meta-0/validator/statistics", ok(json!({"statistics": {}})));
        let processor = ValidatorStatisticsProcessor::new(base_processor(&client, 2, 1), Duration::from_secs(60));
        processor.get_validator_statistics().await.unwrap();

        client.on("http://meta-0", MockReply::Refuse);
        assert!(matches!(
            processor.force_update().await,
            Err(ProxyError::AllObserversFailed { .. })
        ));
        assert_eq!(processor.get_validator_statistics().await.unwrap(), json!({"statistics": {}}));
    }
}
