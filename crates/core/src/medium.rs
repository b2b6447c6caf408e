//! Storage medium: hard disks, DVD and floppy images.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::machine::Machine;
use crate::progress::Progress;
use crate::virtualbox::VirtualBox;
use vbx_protocol::wire;
use vbx_protocol::{DeviceType, MediumVariant, ObjectRef};
use vbx_runtime::{Channel, Error, Result};

/// One registered medium.
///
/// Business fields fill in per accessor. [`get`](Medium::get) runs the full
/// accessor set in a fixed order and stops at the first failure, leaving the
/// fields fetched up to that point populated and the rest at their previous
/// values.
///
/// Parent and child media are tracked by business ID, never by live
/// reference: the accessors resolve each related reference to its ID through
/// a short-lived channel that is released before they return. Resolving an
/// ID back into an entity is a fresh lookup on the caller's side.
pub struct Medium {
    vbox: Arc<VirtualBox>,
    channel: Channel,
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub format: String,
    pub size: i64,
    pub logical_size: i64,
    pub device_type: DeviceType,
    pub host_drive: bool,
    pub machine_ids: Vec<String>,
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
}

impl Medium {
    pub(crate) fn new(vbox: Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self {
            vbox,
            channel,
            id: String::new(),
            name: String::new(),
            description: String::new(),
            location: String::new(),
            format: String::new(),
            size: 0,
            logical_size: 0,
            device_type: DeviceType::Null,
            host_drive: false,
            machine_ids: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
        }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Medium UUID; cached on success.
    pub async fn get_id(&mut self) -> Result<String> {
        self.id = self.channel.fetch("IMedium_getId").await?;
        Ok(self.id.clone())
    }

    pub async fn get_name(&mut self) -> Result<String> {
        self.name = self.channel.fetch("IMedium_getName").await?;
        Ok(self.name.clone())
    }

    pub async fn get_description(&mut self) -> Result<String> {
        self.description = self.channel.fetch("IMedium_getDescription").await?;
        Ok(self.description.clone())
    }

    pub async fn get_location(&mut self) -> Result<String> {
        self.location = self.channel.fetch("IMedium_getLocation").await?;
        Ok(self.location.clone())
    }

    /// Backing format name, e.g. `"VDI"`.
    pub async fn get_format(&mut self) -> Result<String> {
        self.format = self.channel.fetch("IMedium_getFormat").await?;
        Ok(self.format.clone())
    }

    /// Actual on-disk size in bytes.
    pub async fn get_size(&mut self) -> Result<i64> {
        #[derive(Deserialize)]
        struct SizeResponse {
            #[serde(deserialize_with = "wire::int64")]
            returnval: i64,
        }

        let response: SizeResponse = self.channel.send("IMedium_getSize", Value::Null).await?;
        self.size = response.returnval;
        Ok(self.size)
    }

    /// Capacity presented to the guest in bytes.
    pub async fn get_logical_size(&mut self) -> Result<i64> {
        #[derive(Deserialize)]
        struct LogicalSizeResponse {
            #[serde(deserialize_with = "wire::int64")]
            returnval: i64,
        }

        let response: LogicalSizeResponse = self
            .channel
            .send("IMedium_getLogicalSize", Value::Null)
            .await?;
        self.logical_size = response.returnval;
        Ok(self.logical_size)
    }

    pub async fn get_device_type(&mut self) -> Result<DeviceType> {
        self.device_type = self.channel.fetch("IMedium_getDeviceType").await?;
        Ok(self.device_type)
    }

    pub async fn get_host_drive(&mut self) -> Result<bool> {
        #[derive(Deserialize)]
        struct HostDriveResponse {
            #[serde(deserialize_with = "wire::boolean")]
            returnval: bool,
        }

        let response: HostDriveResponse = self
            .channel
            .send("IMedium_getHostDrive", Value::Null)
            .await?;
        self.host_drive = response.returnval;
        Ok(self.host_drive)
    }

    /// UUIDs of the machines this medium is attached to.
    pub async fn get_machine_ids(&mut self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct MachineIdsResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<String>,
        }

        let response: MachineIdsResponse = self
            .channel
            .send("IMedium_getMachineIds", Value::Null)
            .await?;
        self.machine_ids = response.returnval;
        Ok(self.machine_ids.clone())
    }

    /// Minimal aggregate: ID and name, enough for listings.
    pub async fn get_id_name(&mut self) -> Result<()> {
        self.get_id().await?;
        self.get_name().await?;
        Ok(())
    }

    /// Populates every business field.
    ///
    /// Runs the accessors in a fixed order: id, name, description, location,
    /// format, size, logical size, device type, host drive, machine IDs. The
    /// first failure aborts the sequence; earlier fields keep their fetched
    /// values, later ones whatever they held before.
    pub async fn get(&mut self) -> Result<()> {
        self.get_id().await?;
        self.get_name().await?;
        self.get_description().await?;
        self.get_location().await?;
        self.get_format().await?;
        self.get_size().await?;
        self.get_logical_size().await?;
        self.get_device_type().await?;
        self.get_host_drive().await?;
        self.get_machine_ids().await?;
        Ok(())
    }

    /// Parent medium's ID in the differencing chain, `None` for a base
    /// medium. The parent reference the service hands out is resolved to its
    /// ID and released before this returns.
    pub async fn get_parent(&mut self) -> Result<Option<String>> {
        let parent_ref: ObjectRef = self.channel.fetch("IMedium_getParent").await?;
        if parent_ref.is_null() {
            self.parent_id = None;
            return Ok(None);
        }
        let id = self.read_medium_id(parent_ref).await?;
        self.parent_id = Some(id.clone());
        Ok(Some(id))
    }

    /// IDs of the direct children in the differencing chain. Each child
    /// reference is released as soon as its ID is read.
    pub async fn get_children(&mut self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct ChildrenResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<ObjectRef>,
        }

        let response: ChildrenResponse = self
            .channel
            .send("IMedium_getChildren", Value::Null)
            .await?;
        let mut ids = Vec::with_capacity(response.returnval.len());
        for child_ref in response.returnval {
            ids.push(self.read_medium_id(child_ref).await?);
        }
        self.child_ids = ids.clone();
        Ok(ids)
    }

    /// Snapshot IDs under `machine_id` in which this medium is attached.
    pub async fn get_snapshot_ids(&self, machine_id: &str) -> Result<Vec<String>> {
        #[derive(Serialize)]
        struct SnapshotIdsRequest<'a> {
            #[serde(rename = "machineId")]
            machine_id: &'a str,
        }

        #[derive(Deserialize)]
        struct SnapshotIdsResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<String>,
        }

        let response: SnapshotIdsResponse = self
            .channel
            .send("IMedium_getSnapshotIds", SnapshotIdsRequest { machine_id })
            .await?;
        Ok(response.returnval)
    }

    /// Raw reference to the medium's format object. The caller owns it and
    /// releases it through [`VirtualBox::release`].
    pub async fn get_medium_format(&self) -> Result<ObjectRef> {
        self.channel.fetch("IMedium_getMediumFormat").await
    }

    /// Allocates storage for a medium registered via
    /// [`VirtualBox::create_hard_disk`].
    pub async fn create_base_storage(
        &self,
        logical_size: i64,
        variants: &[MediumVariant],
    ) -> Result<Progress> {
        #[derive(Serialize)]
        struct CreateBaseStorageRequest<'a> {
            #[serde(rename = "logicalSize")]
            logical_size: i64,
            variant: &'a [MediumVariant],
        }

        let progress_ref: ObjectRef = self
            .channel
            .send_returnval(
                "IMedium_createBaseStorage",
                CreateBaseStorageRequest {
                    logical_size,
                    variant: variants,
                },
            )
            .await?;
        Ok(Progress::new(self.vbox.channel_for(progress_ref)))
    }

    /// Deletes the storage unit backing this medium.
    pub async fn delete_storage(&self) -> Result<Progress> {
        let progress_ref: ObjectRef = self.channel.fetch("IMedium_deleteStorage").await?;
        Ok(Progress::new(self.vbox.channel_for(progress_ref)))
    }

    /// Detaches this medium from every machine in [`machine_ids`], saving
    /// each machine's settings as it goes.
    ///
    /// Machines are resolved by ID one at a time; on each, every attachment
    /// whose medium resolves to this medium's ID is detached. The resolved
    /// machine reference is released whether or not the detach work
    /// succeeded, with the detach error taking precedence, and the first
    /// failure aborts the walk leaving later machines untouched.
    ///
    /// [`machine_ids`]: Medium::machine_ids
    pub async fn detach_machines(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Precondition(
                "medium ID not populated; fetch it before detaching".into(),
            ));
        }

        for machine_id in &self.machine_ids {
            let machine = self.vbox.find_machine(machine_id).await?;
            tracing::debug!(target: "vbx", machine = %machine_id, medium = %self.id, "detaching");
            let detached = self.detach_from(&machine).await;
            let released = machine.release().await;
            detached?;
            released?;
        }
        Ok(())
    }

    async fn detach_from(&self, machine: &Machine) -> Result<()> {
        let attachments = machine.get_medium_attachments().await?;
        for attachment in attachments {
            if attachment.medium.is_null() {
                continue;
            }
            let attached_id = self.read_medium_id(attachment.medium).await?;
            if attached_id != self.id {
                continue;
            }
            machine
                .detach_device(&attachment.controller, attachment.port, attachment.device)
                .await?;
        }
        machine.save_settings().await
    }

    /// Resolves a borrowed medium reference to its ID, releasing the
    /// reference on success and failure alike. A fetch error takes
    /// precedence over a release error.
    async fn read_medium_id(&self, object_ref: ObjectRef) -> Result<String> {
        let probe = self.vbox.channel_for(object_ref);
        let id: Result<String> = probe.fetch("IMedium_getId").await;
        let released = probe.release().await;
        let id = id?;
        released?;
        Ok(id)
    }

    /// Releases this medium's reference, consuming the handle.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
