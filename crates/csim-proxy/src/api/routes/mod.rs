//! Route tables, one module per endpoint family.

pub mod address;
pub mod block;
pub mod network;
pub mod node;
pub mod proof;
pub mod simulator;
pub mod status;
pub mod transaction;
pub mod vm_values;

use crate::facade::ProxyFacade;
use axum::Router;
use std::sync::Arc;

/// Routes of one endpoint group, `None` for unknown groups
pub fn group_routes(group: &str) -> Option<Router<Arc<ProxyFacade>>> {
    let routes = match group {
        "about" => status::about_routes(),
        "address" => address::routes(),
        "block" => block::block_routes(),
        "blocks" => block::blocks_routes(),
        "hyperblock" => block::hyperblock_routes(),
        "network" => network::routes(),
        "node" => node::node_routes(),
        "proof" => proof::routes(),
        "status" => status::status_routes(),
        "transaction" => transaction::routes(),
        "validator" => node::validator_routes(),
        "vm-values" => vm_values::routes(),
        _ => return None,
    };
    Some(routes)
}
