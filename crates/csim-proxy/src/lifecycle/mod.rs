//! Component lifecycle: background loops and shutdown fan-out.

pub mod background;
pub mod closable;

pub use background::BackgroundLoop;
pub use closable::{Closable, ClosableComponentsHandler};
