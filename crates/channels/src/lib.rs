//! Platform-neutral channel types.
//!
//! Each platform adapter converts its native updates into [`InboundEvent`]s
//! and implements [`ChannelOutbound`] for replies and media resolution.

pub mod error;
pub mod gating;
pub mod plugin;
pub mod store;

pub use {
    error::{Error, Result},
    gating::{GatePolicy, GateRejection, is_allowed},
    plugin::{Attachment, ChannelOutbound, InboundEvent, PhotoSize, SentMessage, Sender},
    store::{Subscriber, SubscriberStore},
};
