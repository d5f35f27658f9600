//! Request processors.
//!
//! [`BaseProcessor`] owns shard routing and observer fallback; every domain
//! processor holds an `Arc` of it and dispatches through [`Dispatch`].

pub mod about;
pub mod account;
pub mod base;
pub mod block;
pub mod esdt_supply;
pub mod faucet;
pub mod node_group;
pub mod node_status;
pub mod proof;
pub mod sc_query;
pub mod status;
pub mod transaction;
pub mod validator_stats;

pub use about::AboutProcessor;
pub use account::AccountProcessor;
pub use base::{BaseProcessor, Dispatch, ObserverReply, NODE_STATUS_PATH};
pub use block::BlockProcessor;
pub use esdt_supply::EsdtSupplyProcessor;
pub use faucet::FaucetProcessor;
pub use node_group::NodeGroupProcessor;
pub use node_status::NodeStatusProcessor;
pub use proof::{ProofProcessor, VerifyProofRequest};
pub use sc_query::ScQueryProcessor;
pub use status::StatusProcessor;
pub use transaction::TransactionProcessor;
pub use validator_stats::ValidatorStatisticsProcessor;
