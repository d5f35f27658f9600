//! Faucet crediting addresses through the simulator.

use crate::domain::{AddressState, FeaturesConfig, ProxyError, ProxyResult};
use crate::ports::SimulatorHandler;
use crate::process::account::AccountProcessor;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub struct FaucetProcessor {
    accounts: Arc<AccountProcessor>,
    simulator: Arc<dyn SimulatorHandler>,
    enabled: bool,
    value: u128,
}

impl FaucetProcessor {
    pub fn new(
        accounts: Arc<AccountProcessor>,
        simulator: Arc<dyn SimulatorHandler>,
        features: &FeaturesConfig,
    ) -> Self {
        Self {
            accounts,
            simulator,
            enabled: features.faucet_enabled,
            // validated at config load
            value: features.faucet_value.parse().unwrap_or(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    /// Credit `receiver` with the configured amount
    pub async fn send_funds(&self, receiver: &str) -> ProxyResult<Value> {
        if !self.enabled {
            return Err(ProxyError::FeatureDisabled("faucet"));
        }

        let current = self.accounts.get_balance_value(receiver).await?;
        let balance = current
            .checked_add(self.value)
            .ok_or_else(|| ProxyError::BadRequest("balance overflow".into()))?;

        let state = AddressState {
            address: receiver.to_string(),
            balance: Some(balance.to_string()),
            ..Default::default()
        };
        self.simulator
            .set_state_multiple(std::slice::from_ref(&state))
            .await
            .map_err(|e| ProxyError::Simulator(e.to_string()))?;

        info!(receiver, value = %self.value, balance = %balance, "Faucet funds sent");
        Ok(json!({ "receiver": receiver, "value": self.value.to_string(), "balance": balance.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{address_in_shard, base_processor, ok, MockObserverClient, MockSimulator};

    fn faucet(
        client: &Arc<MockObserverClient>,
        simulator: &Arc<MockSimulator>,
        enabled: bool,
    ) -> FaucetProcessor {
        let accounts = Arc::new(AccountProcessor::new(base_processor(client, 2, 1)));
        let features = FeaturesConfig {
            faucet_enabled: enabled,
            faucet_value: "1000".into(),
            ..Default::default()
        };
        FaucetProcessor::new(accounts, Arc::clone(simulator) as Arc<dyn SimulatorHandler>, &features)
    }

    #[tokio::test]
    async fn test_credits_current_balance() {
        let client = MockObserverClient::new();
        client.on("http://s1-0/address/", ok(json!({"balance": "250"})));
        let simulator = Arc::new(MockSimulator::default());

        let receiver = address_in_shard(1);
        let data = faucet(&client, &simulator, true).send_funds(&receiver).await.unwrap();
        assert_eq!(data["balance"], "1250");

        let states = simulator.states.lock();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].address, receiver);
        assert_eq!(states[0].balance.as_deref(), Some("1250"));
    }

    #[tokio::test]
    async fn test_disabled_faucet_is_rejected() {
        let client = MockObserverClient::new();
        let simulator = Arc::new(MockSimulator::default());

        let err = faucet(&client, &simulator, false)
            .send_funds(&address_in_shard(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::FeatureDisabled("faucet")));
        assert!(client.calls().is_empty());
        assert!(simulator.states.lock().is_empty());
    }
}
