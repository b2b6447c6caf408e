//! Typed client for the VirtualBox web service.
//!
//! `vboxwebsrv` fronts the VirtualBox API over SOAP: a logon yields a
//! reference to the root `IVirtualBox` object, and every entity reached from
//! it is another session-scoped reference that has to be explicitly released.
//! This crate wraps that surface in owned entity types that carry their
//! reference, share one [`Connection`], and expose the wire operations as
//! async methods:
//!
//! - **[`VirtualBox`]** - authenticated root; lookups, listings, logoff.
//! - **[`Machine`] / [`Session`] / [`Console`]** - locking a machine into a
//!   session and controlling its VM process.
//! - **[`Medium`] / [`Snapshot`] / [`StorageController`]** - storage and
//!   snapshot plumbing, including multi-step flows such as detaching a medium
//!   from every machine that uses it.
//!
//! ```rust
//! use std::sync::Arc;
//! use vbx::{Connection, SoapTransport, VirtualBox};
//!
//! async fn demo() -> vbx::Result<()> {
//!     let transport = SoapTransport::new("http://127.0.0.1:18083");
//!     let connection = Arc::new(Connection::new(Box::new(transport)));
//!     let vbox = VirtualBox::logon(connection, "user", "secret").await?;
//!
//!     let mut machine = vbox.find_machine("ubuntu-dev").await?;
//!     println!("{}", machine.get_name().await?);
//!     machine.release().await?;
//!     vbox.logoff().await
//! }
//! ```
//!
//! References are never released implicitly: dropping an entity leaks its
//! reference on the service side until logoff. The consuming `release`
//! methods make the handoff explicit.

pub mod console;
pub mod machine;
pub mod medium;
pub mod progress;
pub mod session;
pub mod snapshot;
pub mod storage_controller;
pub mod virtualbox;

// Re-export key types at crate root
pub use console::Console;
pub use machine::Machine;
pub use medium::Medium;
pub use progress::Progress;
pub use session::Session;
pub use snapshot::Snapshot;
pub use storage_controller::StorageController;
pub use virtualbox::VirtualBox;

pub use vbx_protocol as protocol;
pub use vbx_protocol::{
    DeviceType, LockType, MediumAttachment, MediumVariant, ObjectRef, StorageBus,
};
pub use vbx_runtime as runtime;
pub use vbx_runtime::{Channel, Connection, Error, Result, SoapTransport, Transport};
