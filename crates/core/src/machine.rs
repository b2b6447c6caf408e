//! Registered virtual machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::medium::Medium;
use crate::snapshot::Snapshot;
use crate::storage_controller::StorageController;
use crate::virtualbox::VirtualBox;
use vbx_protocol::wire;
use vbx_protocol::{DeviceType, MediumAttachment, ObjectRef};
use vbx_runtime::{Channel, Result};

/// One registered machine.
///
/// Business fields start empty and fill in as the accessors run; a value
/// cached by an earlier call survives later failures. The reference must be
/// released when the handle is no longer needed.
#[derive(Debug)]
pub struct Machine {
    vbox: Arc<VirtualBox>,
    channel: Channel,
    pub id: String,
    pub name: String,
    pub settings_file_path: String,
}

impl Machine {
    pub(crate) fn new(vbox: Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self {
            vbox,
            channel,
            id: String::new(),
            name: String::new(),
            settings_file_path: String::new(),
        }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Machine UUID; cached on success.
    pub async fn get_id(&mut self) -> Result<String> {
        self.id = self.channel.fetch("IMachine_getId").await?;
        Ok(self.id.clone())
    }

    pub async fn get_name(&mut self) -> Result<String> {
        self.name = self.channel.fetch("IMachine_getName").await?;
        Ok(self.name.clone())
    }

    pub async fn get_settings_file_path(&mut self) -> Result<String> {
        self.settings_file_path = self.channel.fetch("IMachine_getSettingsFilePath").await?;
        Ok(self.settings_file_path.clone())
    }

    /// Persists pending settings changes.
    ///
    /// On failure the pending changes are discarded before the save error is
    /// returned, so the machine does not stay dirty. A failure of the discard
    /// itself is logged and dropped in favor of the save error.
    pub async fn save_settings(&self) -> Result<()> {
        match self
            .channel
            .send_no_result("IMachine_saveSettings", Value::Null)
            .await
        {
            Ok(()) => Ok(()),
            Err(save_err) => {
                if let Err(discard_err) = self.discard_settings().await {
                    tracing::debug!(
                        target: "vbx",
                        error = %discard_err,
                        "discard after failed save also failed"
                    );
                }
                Err(save_err)
            }
        }
    }

    /// Drops pending settings changes.
    pub async fn discard_settings(&self) -> Result<()> {
        self.channel
            .send_no_result("IMachine_discardSettings", Value::Null)
            .await
    }

    /// Swaps this handle onto a fresh reference for the same machine, looked
    /// up by the cached ID. The old reference is dropped, not released;
    /// cached fields are kept as they were.
    pub async fn refresh(&mut self) -> Result<()> {
        let refreshed = self.vbox.find_machine(&self.id).await?;
        self.channel = refreshed.channel;
        Ok(())
    }

    /// Attachment records across all controllers.
    pub async fn get_medium_attachments(&self) -> Result<Vec<MediumAttachment>> {
        #[derive(Deserialize)]
        struct AttachmentsResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<MediumAttachment>,
        }

        let response: AttachmentsResponse = self
            .channel
            .send("IMachine_getMediumAttachments", Value::Null)
            .await?;
        Ok(response.returnval)
    }

    /// Attachment records on one controller.
    pub async fn get_medium_attachments_of_controller(
        &self,
        name: &str,
    ) -> Result<Vec<MediumAttachment>> {
        #[derive(Serialize)]
        struct OfControllerRequest<'a> {
            name: &'a str,
        }

        #[derive(Deserialize)]
        struct AttachmentsResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<MediumAttachment>,
        }

        let response: AttachmentsResponse = self
            .channel
            .send(
                "IMachine_getMediumAttachmentsOfController",
                OfControllerRequest { name },
            )
            .await?;
        Ok(response.returnval)
    }

    /// Attaches a medium to a controller slot. The change is pending until
    /// [`save_settings`](Machine::save_settings).
    pub async fn attach_device(
        &self,
        controller: &str,
        port: i32,
        device: i32,
        device_type: DeviceType,
        medium: &Medium,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct AttachDeviceRequest<'a> {
            name: &'a str,
            #[serde(rename = "controllerPort")]
            controller_port: i32,
            device: i32,
            #[serde(rename = "type")]
            device_type: DeviceType,
            medium: &'a ObjectRef,
        }

        self.channel
            .send_no_result(
                "IMachine_attachDevice",
                AttachDeviceRequest {
                    name: controller,
                    controller_port: port,
                    device,
                    device_type,
                    medium: medium.object_ref(),
                },
            )
            .await
    }

    /// Detaches whatever occupies a controller slot.
    pub async fn detach_device(&self, controller: &str, port: i32, device: i32) -> Result<()> {
        #[derive(Serialize)]
        struct DetachDeviceRequest<'a> {
            name: &'a str,
            #[serde(rename = "controllerPort")]
            controller_port: i32,
            device: i32,
        }

        self.channel
            .send_no_result(
                "IMachine_detachDevice",
                DetachDeviceRequest {
                    name: controller,
                    controller_port: port,
                    device,
                },
            )
            .await
    }

    /// Controller lookup by name. The controller comes back with its name
    /// cache seeded from the lookup key.
    pub async fn get_storage_controller_by_name(&self, name: &str) -> Result<StorageController> {
        #[derive(Serialize)]
        struct ByNameRequest<'a> {
            name: &'a str,
        }

        let controller_ref: ObjectRef = self
            .channel
            .send_returnval("IMachine_getStorageControllerByName", ByNameRequest { name })
            .await?;
        let mut controller = StorageController::new(&self.vbox, controller_ref);
        controller.name = name.to_owned();
        Ok(controller)
    }

    pub async fn get_storage_controllers(&self) -> Result<Vec<StorageController>> {
        #[derive(Deserialize)]
        struct ControllersResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<ObjectRef>,
        }

        let response: ControllersResponse = self
            .channel
            .send("IMachine_getStorageControllers", Value::Null)
            .await?;
        Ok(response
            .returnval
            .into_iter()
            .map(|controller_ref| StorageController::new(&self.vbox, controller_ref))
            .collect())
    }

    /// Snapshot lookup by name or UUID.
    pub async fn find_snapshot(&self, name_or_id: &str) -> Result<Snapshot> {
        #[derive(Serialize)]
        struct FindSnapshotRequest<'a> {
            #[serde(rename = "nameOrId")]
            name_or_id: &'a str,
        }

        let snapshot_ref: ObjectRef = self
            .channel
            .send_returnval("IMachine_findSnapshot", FindSnapshotRequest { name_or_id })
            .await?;
        Ok(Snapshot::new(Arc::clone(&self.vbox), snapshot_ref))
    }

    /// Releases this machine's reference, consuming the handle.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
