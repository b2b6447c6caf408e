//! Wire types for the VirtualBox web service protocol.
//!
//! The web service exposes every API object as a managed object reference:
//! an opaque string token minted for one authenticated session. This crate
//! contains the serde-serializable types shared by the runtime and the
//! typed client - the reference newtype, the enumerations that cross the
//! wire as strings, and deserialization helpers tolerant of the
//! text-encoded scalars the SOAP transport produces.
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with the wire**: Match the shapes vboxwebsrv sends and expects
//!
//! Higher-level ergonomic APIs are built on top of these types in `vbx`.

pub mod types;
pub mod wire;

pub use types::{DeviceType, LockType, MediumAttachment, MediumVariant, ObjectRef, StorageBus};
