//! Adapters implementing the outbound ports.

pub mod hex_converter;
pub mod http_client;

pub use hex_converter::HexAddressConverter;
pub use http_client::HttpObserverClient;
