//! Telegram adapter for parlor.
//!
//! Long-polls the Bot API with teloxide, turns messages into
//! `InboundEvent`s for the reply pipeline, answers the subscription commands
//! and implements `ChannelOutbound` for replies and file resolution.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod plugin;
pub mod state;

#[cfg(test)]
mod testing;

pub use {
    bot::SharedDeps,
    config::TelegramAccountConfig,
    error::{Error, Result},
    outbound::TelegramOutbound,
    plugin::TelegramChannel,
};
