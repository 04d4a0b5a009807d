//! Builders to construct channels from code or configuration.

pub mod channel_builder;

pub use channel_builder::ChannelBuilder;
