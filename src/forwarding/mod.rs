//! Deal forwarding module - one-pass pipeline from DMS export to webhook

pub mod checkpoint;
pub mod dispatch;
pub mod fetch;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use types::*;
