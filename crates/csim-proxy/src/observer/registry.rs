//! # Observer Registry
//!
//! Observer and full-history nodes grouped per shard. Built once from
//! configuration; the per-shard order is the dispatch preference order.
//!
//! After construction the maps are never written. The only mutable state is
//! the per-node synced flag, so concurrent readers never contend on a lock.

use crate::domain::{NodeConfig, ObserverError};
use crate::observer::node::ObserverNode;
use csim_sharding::{shard_display, ShardCoordinator, ShardId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Which kind of node a query needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAvailability {
    /// Current state, any observer will do
    Recent,
    /// Historical state, full-history nodes preferred
    AllHistory,
}

type ShardNodes = HashMap<ShardId, Vec<Arc<ObserverNode>>>;

/// Immutable per-shard node lists
#[derive(Debug)]
pub struct ObserverRegistry {
    shard_ids: Vec<ShardId>,
    observers: ShardNodes,
    full_history: ShardNodes,
}

impl ObserverRegistry {
    /// Build the registry.
    ///
    /// Every shard known to `coordinator`, metachain included, must have at
    /// least one observer. Missing full-history nodes only degrade
    /// historical queries.
    pub fn new(
        coordinator: &ShardCoordinator,
        observers: &[NodeConfig],
        full_history_nodes: &[NodeConfig],
    ) -> Result<Self, ObserverError> {
        let observers = group_by_shard(coordinator, observers)?;
        for shard in coordinator.all_shard_ids() {
            if observers.get(&shard).map_or(true, Vec::is_empty) {
                return Err(ObserverError::EmptyObserversList { shard });
            }
        }

        let full_history = match full_history_provider(coordinator, full_history_nodes) {
            Ok(nodes) => nodes,
            Err(ObserverError::EmptyObserversList { .. }) => {
                warn!("no full history nodes configured, historical queries use regular observers");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        info!(
            shards = coordinator.all_shard_ids().len(),
            observers = observers.values().map(Vec::len).sum::<usize>(),
            full_history = full_history.values().map(Vec::len).sum::<usize>(),
            "Observer registry created"
        );

        Ok(Self {
            shard_ids: coordinator.all_shard_ids(),
            observers,
            full_history,
        })
    }

    /// Shards served, regular shards first, metachain last
    pub fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    /// Observers of `shard` in preference order; empty for unknown shards
    pub fn observers_for_shard(&self, shard: ShardId) -> &[Arc<ObserverNode>] {
        self.observers.get(&shard).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Full-history nodes of `shard`; may be empty
    pub fn full_history_nodes_for_shard(&self, shard: ShardId) -> &[Arc<ObserverNode>] {
        self.full_history
            .get(&shard)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes able to answer a query with the given data needs
    pub fn observers_for_data_availability(
        &self,
        shard: ShardId,
        availability: DataAvailability,
    ) -> &[Arc<ObserverNode>] {
        match availability {
            DataAvailability::AllHistory => {
                let nodes = self.full_history_nodes_for_shard(shard);
                if nodes.is_empty() {
                    self.observers_for_shard(shard)
                } else {
                    nodes
                }
            }
            DataAvailability::Recent => self.observers_for_shard(shard),
        }
    }

    /// Every observer, shard by shard in shard order
    pub fn all_observers(&self) -> Vec<Arc<ObserverNode>> {
        self.shard_ids
            .iter()
            .flat_map(|shard| self.observers_for_shard(*shard).iter().cloned())
            .collect()
    }

    /// Every full-history node, shard by shard in shard order
    pub fn all_full_history_nodes(&self) -> Vec<Arc<ObserverNode>> {
        self.shard_ids
            .iter()
            .flat_map(|shard| self.full_history_nodes_for_shard(*shard).iter().cloned())
            .collect()
    }
}

fn full_history_provider(
    coordinator: &ShardCoordinator,
    nodes: &[NodeConfig],
) -> Result<ShardNodes, ObserverError> {
    if nodes.is_empty() {
        return Err(ObserverError::EmptyObserversList {
            shard: coordinator.self_id(),
        });
    }

    let grouped = group_by_shard(coordinator, nodes)?;
    for shard in coordinator.all_shard_ids() {
        if !grouped.contains_key(&shard) {
            warn!(
                shard = %shard_display(shard),
                "no full history node for shard"
            );
        }
    }
    Ok(grouped)
}

fn group_by_shard(
    coordinator: &ShardCoordinator,
    nodes: &[NodeConfig],
) -> Result<ShardNodes, ObserverError> {
    let mut grouped: ShardNodes = HashMap::new();
    for config in nodes {
        if !coordinator.is_known(config.shard_id) {
            return Err(ObserverError::UnknownShard {
                address: config.address.clone(),
                shard: config.shard_id,
            });
        }
        grouped
            .entry(config.shard_id)
            .or_default()
            .push(Arc::new(ObserverNode::from(config)));
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use csim_sharding::METACHAIN_SHARD_ID;

    fn node(shard_id: ShardId, address: &str) -> NodeConfig {
        NodeConfig {
            shard_id,
            address: address.to_string(),
            is_snapshotless: false,
        }
    }

    fn coordinator() -> ShardCoordinator {
        ShardCoordinator::new(2, METACHAIN_SHARD_ID).unwrap()
    }

    fn observers() -> Vec<NodeConfig> {
        vec![
            node(0, "http://s0-a"),
            node(1, "http://s1-a"),
            node(0, "http://s0-b"),
            node(METACHAIN_SHARD_ID, "http://meta-a"),
        ]
    }

    #[test]
    fn test_groups_in_declaration_order() {
        let registry = ObserverRegistry::new(&coordinator(), &observers(), &[]).unwrap();

        let shard0: Vec<_> = registry
            .observers_for_shard(0)
            .iter()
            .map(|n| n.address().to_string())
            .collect();
        assert_eq!(shard0, vec!["http://s0-a", "http://s0-b"]);

        for shard in coordinator().all_shard_ids() {
            assert!(!registry.observers_for_shard(shard).is_empty());
        }
    }

    #[test]
    fn test_missing_shard_is_fatal() {
        let configs = vec![node(0, "http://s0-a"), node(METACHAIN_SHARD_ID, "http://m")];
        let err = ObserverRegistry::new(&coordinator(), &configs, &[]).unwrap_err();
        assert_eq!(err, ObserverError::EmptyObserversList { shard: 1 });
    }

    #[test]
    fn test_missing_metachain_is_fatal() {
        let configs = vec![node(0, "http://s0"), node(1, "http://s1")];
        let err = ObserverRegistry::new(&coordinator(), &configs, &[]).unwrap_err();
        assert_eq!(
            err,
            ObserverError::EmptyObserversList {
                shard: METACHAIN_SHARD_ID
            }
        );
    }

    #[test]
    fn test_unknown_shard_rejected() {
        let mut configs = observers();
        configs.push(node(7, "http://s7"));
        assert!(matches!(
            ObserverRegistry::new(&coordinator(), &configs, &[]),
            Err(ObserverError::UnknownShard { shard: 7, .. })
        ));
    }

    #[test]
    fn test_empty_full_history_tolerated() {
        let registry = ObserverRegistry::new(&coordinator(), &observers(), &[]).unwrap();
        assert!(registry.full_history_nodes_for_shard(0).is_empty());
        assert!(registry.all_full_history_nodes().is_empty());

        // historical queries fall back to observers
        let nodes = registry.observers_for_data_availability(0, DataAvailability::AllHistory);
        assert_eq!(nodes[0].address(), "http://s0-a");
    }

    #[test]
    fn test_full_history_preferred() {
        let registry = ObserverRegistry::new(
            &coordinator(),
            &observers(),
            &[node(1, "http://s1-history")],
        )
        .unwrap();

        let nodes = registry.observers_for_data_availability(1, DataAvailability::AllHistory);
        assert_eq!(nodes[0].address(), "http://s1-history");
        let nodes = registry.observers_for_data_availability(1, DataAvailability::Recent);
        assert_eq!(nodes[0].address(), "http://s1-a");
        // shard 0 has no full history node
        let nodes = registry.observers_for_data_availability(0, DataAvailability::AllHistory);
        assert_eq!(nodes[0].address(), "http://s0-a");
    }

    #[test]
    fn test_all_observers_order() {
        let registry = ObserverRegistry::new(&coordinator(), &observers(), &[]).unwrap();
        let addresses: Vec<_> = registry
            .all_observers()
            .iter()
            .map(|n| n.address().to_string())
            .collect();
        assert_eq!(
            addresses,
            vec!["http://s0-a", "http://s0-b", "http://s1-a", "http://meta-a"]
        );
        assert!(registry.observers_for_shard(9).is_empty());
    }
}
