//! Core protocol types: managed object references and wire enumerations.

use serde::{Deserialize, Serialize};

use crate::wire;

/// Opaque managed object reference handed out by the web service.
///
/// The service identifies every remote object by a string token scoped to
/// the session that produced it. The token carries no structure a client
/// may rely on, and it becomes dangling once the object is released or the
/// session ends. An empty string encodes "no object".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True for the empty reference the service uses as a null object.
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ObjectRef {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ObjectRef {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// Lock variants accepted by `IMachine_lockMachine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    Null,
    Shared,
    Write,
    VM,
}

/// Storage bus kinds reported by `IStorageController_getBus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBus {
    Null,
    #[serde(rename = "IDE")]
    Ide,
    #[serde(rename = "SATA")]
    Sata,
    #[serde(rename = "SCSI")]
    Scsi,
    Floppy,
    #[serde(rename = "SAS")]
    Sas,
    #[serde(rename = "USB")]
    Usb,
}

/// Device kinds a medium or attachment slot can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Null,
    Floppy,
    #[serde(rename = "DVD")]
    Dvd,
    HardDisk,
    Network,
    #[serde(rename = "USB")]
    Usb,
    SharedFolder,
}

/// Storage creation variants for `IMedium_createBaseStorage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediumVariant {
    Standard,
    Fixed,
    Diff,
}

/// One device slot on a storage controller, as the machine reports it.
///
/// Attachments are plain data, not managed objects: the service returns
/// them inline and there is nothing to release. The `medium` reference is
/// null for an empty removable drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediumAttachment {
    #[serde(default)]
    pub medium: ObjectRef,
    /// Name of the storage controller the slot belongs to.
    #[serde(default)]
    pub controller: String,
    #[serde(default, deserialize_with = "wire::int32")]
    pub port: i32,
    #[serde(default, deserialize_with = "wire::int32")]
    pub device: i32,
    #[serde(rename = "type", default)]
    pub device_type: DeviceType,
    #[serde(default, deserialize_with = "wire::boolean")]
    pub passthrough: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_ref_serializes_as_bare_string() {
        let r = ObjectRef::new("fe2a83b-0001");
        assert_eq!(serde_json::to_value(&r).unwrap(), json!("fe2a83b-0001"));

        let back: ObjectRef = serde_json::from_value(json!("fe2a83b-0001")).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn empty_object_ref_is_null() {
        assert!(ObjectRef::default().is_null());
        assert!(ObjectRef::new("").is_null());
        assert!(!ObjectRef::new("x").is_null());
    }

    #[test]
    fn enums_use_service_spellings() {
        assert_eq!(serde_json::to_value(LockType::VM).unwrap(), json!("VM"));
        assert_eq!(serde_json::to_value(LockType::Write).unwrap(), json!("Write"));
        assert_eq!(serde_json::to_value(StorageBus::Sata).unwrap(), json!("SATA"));
        assert_eq!(serde_json::to_value(StorageBus::Floppy).unwrap(), json!("Floppy"));
        assert_eq!(serde_json::to_value(DeviceType::Dvd).unwrap(), json!("DVD"));
        assert_eq!(
            serde_json::to_value(DeviceType::HardDisk).unwrap(),
            json!("HardDisk")
        );
        assert_eq!(
            serde_json::to_value(MediumVariant::Standard).unwrap(),
            json!("Standard")
        );

        let bus: StorageBus = serde_json::from_value(json!("SCSI")).unwrap();
        assert_eq!(bus, StorageBus::Scsi);
    }

    #[test]
    fn attachment_accepts_text_scalars() {
        let attachment: MediumAttachment = serde_json::from_value(json!({
            "medium": "ref-77",
            "controller": "SATA Controller",
            "port": "2",
            "device": "0",
            "type": "HardDisk",
            "passthrough": "false",
        }))
        .unwrap();

        assert_eq!(attachment.medium, ObjectRef::new("ref-77"));
        assert_eq!(attachment.controller, "SATA Controller");
        assert_eq!(attachment.port, 2);
        assert_eq!(attachment.device, 0);
        assert_eq!(attachment.device_type, DeviceType::HardDisk);
        assert!(!attachment.passthrough);
    }

    #[test]
    fn attachment_defaults_missing_fields() {
        let attachment: MediumAttachment =
            serde_json::from_value(json!({ "controller": "IDE Controller", "port": 1 })).unwrap();

        assert!(attachment.medium.is_null());
        assert_eq!(attachment.port, 1);
        assert_eq!(attachment.device, 0);
        assert_eq!(attachment.device_type, DeviceType::Null);
    }
}
