//! Configuration models for channels.

pub mod channel;

pub use channel::{ChannelConfig, DeferralConfig};
