//! # botlink
//!
//! Bot API gateway: send messages, manage the webhook registration, and
//! receive updates either by polling or by webhook push.

pub mod api;
pub mod certificate;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod poller;
pub mod transport;
pub mod types;

pub use error::{BotlinkError, Result};
pub use gateway::{BotIdentity, Gateway};
pub use handler::{handler_fn, UpdateHandler};
pub use poller::Poller;
pub use types::{Update, WebhookInfo};
