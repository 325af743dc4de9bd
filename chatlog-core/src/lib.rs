//! # chatlog-core
//!
//! Origin entity model ([`OriginChat`], [`OriginUser`], [`OriginMessage`]), the [`Transport`] trait the
//! archiver consumes, transport errors, and tracing initialization. Transport-agnostic; used by
//! ingest and chatlog-telegram.

pub mod error;
pub mod logger;
pub mod transport;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use logger::init_tracing;
pub use transport::{ChatTarget, HistoryRequest, Transport};
pub use types::{
    EventKind, InboundEvent, MediaKind, OriginChat, OriginGroup, OriginMessage, OriginUser,
    ReplyRef, ServiceAction,
};
