//! Simulator control operations.

use crate::domain::{
    AddressState, FacadeError, InitialWalletKeys, ObserverInfo, SimulatorError, ValidatorKeys,
};
use crate::ports::SimulatorHandler;
use crate::process::ValidatorStatisticsProcessor;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SimulatorFacade {
    simulator: Arc<dyn SimulatorHandler>,
    validator_stats: Arc<ValidatorStatisticsProcessor>,
}

impl SimulatorFacade {
    pub fn new(
        simulator: Arc<dyn SimulatorHandler>,
        validator_stats: Arc<ValidatorStatisticsProcessor>,
    ) -> Self {
        Self {
            simulator,
            validator_stats,
        }
    }

    /// Produce `num_of_blocks` blocks, one at a time
    pub async fn generate_blocks(&self, num_of_blocks: i64) -> Result<(), FacadeError> {
        if num_of_blocks <= 0 {
            return Err(FacadeError::InvalidBlockCount(num_of_blocks));
        }
        for _ in 0..num_of_blocks {
            self.simulator.generate_block().await?;
        }
        debug!(num_of_blocks, "Blocks generated");
        Ok(())
    }

    pub async fn generate_blocks_until_epoch_is_reached(
        &self,
        target_epoch: i32,
    ) -> Result<(), FacadeError> {
        self.simulator
            .generate_blocks_until_epoch_is_reached(target_epoch)
            .await?;
        Ok(())
    }

    pub fn get_initial_wallet_keys(&self) -> InitialWalletKeys {
        self.simulator.initial_wallet_keys()
    }

    pub async fn set_key_value_for_address(
        &self,
        address: &str,
        pairs: BTreeMap<String, String>,
    ) -> Result<(), FacadeError> {
        self.simulator.set_key_value_for_address(address, pairs).await?;
        Ok(())
    }

    pub async fn set_state_multiple(&self, states: &[AddressState]) -> Result<(), FacadeError> {
        self.simulator.set_state_multiple(states).await?;
        Ok(())
    }

    /// Drop every listed account first, then write the new state
    pub async fn set_state_multiple_overwrite(
        &self,
        states: &[AddressState],
    ) -> Result<(), FacadeError> {
        for state in states {
            match self
                .simulator
                .remove_accounts(std::slice::from_ref(&state.address))
                .await
            {
                Ok(()) | Err(SimulatorError::AccountNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.set_state_multiple(states).await
    }

    /// Keys arrive base64 encoded hex strings
    pub async fn add_validator_keys(&self, validators: &ValidatorKeys) -> Result<(), FacadeError> {
        let keys = validators
            .private_keys_base64
            .iter()
            .enumerate()
            .map(|(index, encoded)| {
                let hex_text = STANDARD.decode(encoded).map_err(|e| FacadeError::Base64Decode {
                    index,
                    reason: e.to_string(),
                })?;
                hex::decode(hex_text).map_err(|e| FacadeError::HexDecode {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = keys.len();
        self.simulator.add_validator_keys(keys).await?;
        info!(count, "Validator keys added");
        Ok(())
    }

    /// Reset the simulator's statistics and refill the proxy cache right away
    pub async fn force_update_validator_statistics(&self) -> Result<(), FacadeError> {
        self.simulator.force_reset_validator_statistics_cache()?;
        self.validator_stats.force_update().await?;
        Ok(())
    }

    pub fn get_observers_info(&self) -> Result<BTreeMap<u32, ObserverInfo>, FacadeError> {
        self.simulator
            .rest_api_interfaces()
            .into_iter()
            .map(|(shard, interface)| {
                let port = match interface.split(':').collect::<Vec<_>>().as_slice() {
                    [_, port] => *port,
                    _ => return Err(FacadeError::PortExtraction { shard }),
                };
                let api_port = port
                    .parse::<u16>()
                    .map_err(|_| FacadeError::PortParse { shard })?;
                Ok((shard, ObserverInfo { api_port }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{base_processor, ok, MockObserverClient, MockSimulator};
    use serde_json::json;
    use std::time::Duration;

    fn setup(simulator: MockSimulator) -> (SimulatorFacade, Arc<MockSimulator>, Arc<MockObserverClient>) {
        let client = MockObserverClient::new();
        let stats = Arc::new(ValidatorStatisticsProcessor::new(
            base_processor(&client, 2, 1),
            Duration::from_secs(60),
        ));
        let simulator = Arc::new(simulator);
        let facade = SimulatorFacade::new(Arc::clone(&simulator) as Arc<dyn SimulatorHandler>, stats);
        (facade, simulator, client)
    }

    #[tokio::test]
    async fn test_generate_blocks_calls_handler_n_times() {
        let (facade, simulator, _) = setup(MockSimulator::default());
        facade.generate_blocks(5).await.unwrap();
        assert_eq!(simulator.blocks(), 5);
    }

    #[tokio::test]
    async fn test_generate_blocks_rejects_non_positive() {
        let (facade, simulator, _) = setup(MockSimulator::default());
        for num in [0, -3] {
            assert!(matches!(
                facade.generate_blocks(num).await,
                Err(FacadeError::InvalidBlockCount(n)) if n == num
            ));
        }
        assert_eq!(simulator.blocks(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_ignores_missing_accounts() {
        let (facade, simulator, _) = setup(MockSimulator {
            missing_accounts: vec!["bb".into()],
            ..Default::default()
        });
        let states: Vec<AddressState> = ["aa", "bb"]
            .iter()
            .map(|address| AddressState {
                address: address.to_string(),
                ..Default::default()
            })
            .collect();

        facade.set_state_multiple_overwrite(&states).await.unwrap();
        assert_eq!(*simulator.removed.lock(), vec!["aa".to_string()]);
        assert_eq!(simulator.states.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_add_validator_keys_decodes_twice() {
        let (facade, simulator, _) = setup(MockSimulator::default());
        let keys = ValidatorKeys {
            private_keys_base64: vec![STANDARD.encode("0a0b"), STANDARD.encode("ff")],
        };
        facade.add_validator_keys(&keys).await.unwrap();
        assert_eq!(*simulator.keys.lock(), vec![vec![0x0a, 0x0b], vec![0xff]]);
    }

    #[tokio::test]
    async fn test_add_validator_keys_names_failing_index() {
        let (facade, simulator, _) = setup(MockSimulator::default());

        let bad_base64 = ValidatorKeys {
            private_keys_base64: vec![STANDARD.encode("00"), "%%%".into()],
        };
        let err = facade.add_validator_keys(&bad_base64).await.unwrap_err();
        assert!(err.to_string().starts_with("cannot base64 decode key index=1"));

        let bad_hex = ValidatorKeys {
            private_keys_base64: vec![STANDARD.encode("zz")],
        };
        let err = facade.add_validator_keys(&bad_hex).await.unwrap_err();
        assert!(err.to_string().starts_with("cannot hex decode key index=0"));
        assert!(simulator.keys.lock().is_empty());
    }

    #[test]
    fn test_observers_info() {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(0, "127.0.0.1:55801".to_string());
        interfaces.insert(u32::MAX, "localhost:55802".to_string());
        let (facade, _, _) = setup(MockSimulator {
            interfaces,
            ..Default::default()
        });

        let info = facade.get_observers_info().unwrap();
        assert_eq!(info[&0].api_port, 55801);
        assert_eq!(info[&u32::MAX].api_port, 55802);
    }

    #[test]
    fn test_observers_info_errors() {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(1, "no-port".to_string());
        let (facade, _, _) = setup(MockSimulator {
            interfaces,
            ..Default::default()
        });
        assert_eq!(
            facade.get_observers_info().unwrap_err().to_string(),
            "cannot extract port for shard ID=1"
        );

        let mut interfaces = BTreeMap::new();
        interfaces.insert(2, "host:http".to_string());
        let (facade, _, _) = setup(MockSimulator {
            interfaces,
            ..Default::default()
        });
        assert_eq!(
            facade.get_observers_info().unwrap_err().to_string(),
            "cannot cast port string to int for shard ID=2"
        );
    }

    #[tokio::test]
    async fn test_force_update_refreshes_proxy_cache() {
        let (facade, simulator, client) = setup(MockSimulator::default());
        client.on(
            "http://meta-0/validator/statistics",
            ok(json!({"statistics": {"key": {"rating": 50}}})),
        );

        facade.force_update_validator_statistics().await.unwrap();
        assert_eq!(simulator.stats_resets.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(
            facade.validator_stats.get_validator_statistics().await.unwrap()["statistics"]["key"]["rating"],
            50
        );
        assert_eq!(client.calls().len(), 1);
    }
}
