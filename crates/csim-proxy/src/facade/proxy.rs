//! Entry point of the HTTP handlers into the domain processors.

use crate::process::{
    AboutProcessor, AccountProcessor, BlockProcessor, EsdtSupplyProcessor, FaucetProcessor,
    NodeGroupProcessor, NodeStatusProcessor, ProofProcessor, ScQueryProcessor, StatusProcessor,
    TransactionProcessor, ValidatorStatisticsProcessor,
};
use std::sync::Arc;

/// Processors backing one API version
pub struct ProxyFacadeArgs {
    pub account: Arc<AccountProcessor>,
    pub transaction: Arc<TransactionProcessor>,
    pub block: Arc<BlockProcessor>,
    pub node_group: Arc<NodeGroupProcessor>,
    pub validator_stats: Arc<ValidatorStatisticsProcessor>,
    pub node_status: Arc<NodeStatusProcessor>,
    pub proof: Arc<ProofProcessor>,
    pub sc_query: Arc<ScQueryProcessor>,
    pub esdt_supply: Arc<EsdtSupplyProcessor>,
    pub status: Arc<StatusProcessor>,
    pub about: Arc<AboutProcessor>,
    pub faucet: Arc<FaucetProcessor>,
}

pub struct ProxyFacade {
    processors: ProxyFacadeArgs,
}

impl ProxyFacade {
    pub fn new(args: ProxyFacadeArgs) -> Self {
        Self { processors: args }
    }

    pub fn account(&self) -> &AccountProcessor {
        &self.processors.account
    }

    pub fn transaction(&self) -> &TransactionProcessor {
        &self.processors.transaction
    }

    pub fn block(&self) -> &BlockProcessor {
        &self.processors.block
    }

    pub fn node_group(&self) -> &NodeGroupProcessor {
        &self.processors.node_group
    }

    pub fn validator_stats(&self) -> &ValidatorStatisticsProcessor {
        &self.processors.validator_stats
    }

    pub fn node_status(&self) -> &NodeStatusProcessor {
        &self.processors.node_status
    }

    pub fn proof(&self) -> &ProofProcessor {
        &self.processors.proof
    }

    pub fn sc_query(&self) -> &ScQueryProcessor {
        &self.processors.sc_query
    }

    pub fn esdt_supply(&self) -> &EsdtSupplyProcessor {
        &self.processors.esdt_supply
    }

    pub fn status(&self) -> &StatusProcessor {
        &self.processors.status
    }

    pub fn about(&self) -> &AboutProcessor {
        &self.processors.about
    }

    pub fn faucet(&self) -> &FaucetProcessor {
        &self.processors.faucet
    }
}
