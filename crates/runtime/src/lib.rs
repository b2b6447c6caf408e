//! Runtime plumbing for the VirtualBox web service client.
//!
//! This crate provides the layers below the typed API:
//!
//! - **Transport**: one SOAP request/response per operation over HTTP
//! - **Connection**: the shared context every reference of a session
//!   points through, including reference release
//! - **Channel**: typed request helper bound to one managed object
//!   reference
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │     vbx      │  Typed entities (Machine, Session, Medium, ...)
//! └──────┬───────┘
//!        │ Channel::send
//! ┌──────▼───────┐
//! │ vbx-runtime  │  This crate
//! │  ┌─────────┐ │
//! │  │ Channel │ │  `_this` injection, returnval extraction
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │  Conn   │ │  Session-shared context, release
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │  Soap   │ │  Envelope render/parse, fault mapping
//! │  └─────────┘ │
//! └──────────────┘
//! ```
//!
//! # Decoupling via Transport
//!
//! `Connection` drives a [`Transport`] trait object, so entity code never
//! sees the SOAP encoding. [`testing::ScriptedTransport`] implements the
//! same trait from canned outcomes and exercises every layer above it.

pub mod channel;
pub mod connection;
pub mod error;
pub mod soap;
pub mod testing;
pub mod transport;

// Re-export key types at crate root
pub use channel::Channel;
pub use connection::Connection;
pub use error::{Error, Result};
pub use soap::SoapTransport;
pub use transport::{InvokeFuture, Transport};
