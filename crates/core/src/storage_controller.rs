//! Storage controller of a machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::machine::Machine;
use crate::virtualbox::VirtualBox;
use vbx_protocol::wire;
use vbx_protocol::{ObjectRef, StorageBus};
use vbx_runtime::{Channel, Error, Result};

/// One storage controller.
///
/// `name` is seeded when the controller comes out of a by-name lookup and
/// refreshed by [`get_name`](StorageController::get_name); the bus mapping
/// and the port scan work off the cached value without a remote call.
pub struct StorageController {
    channel: Channel,
    pub name: String,
    pub port_count: u32,
    pub max_port_count: u32,
}

impl StorageController {
    pub(crate) fn new(vbox: &Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self {
            channel,
            name: String::new(),
            port_count: 0,
            max_port_count: 0,
        }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Display name; cached on success.
    pub async fn get_name(&mut self) -> Result<String> {
        self.name = self.channel.fetch("IStorageController_getName").await?;
        Ok(self.name.clone())
    }

    pub async fn get_port_count(&mut self) -> Result<u32> {
        #[derive(Deserialize)]
        struct PortCountResponse {
            #[serde(deserialize_with = "wire::uint32")]
            returnval: u32,
        }

        let response: PortCountResponse = self
            .channel
            .send("IStorageController_getPortCount", Value::Null)
            .await?;
        self.port_count = response.returnval;
        Ok(self.port_count)
    }

    pub async fn get_max_port_count(&mut self) -> Result<u32> {
        #[derive(Deserialize)]
        struct MaxPortCountResponse {
            #[serde(deserialize_with = "wire::uint32")]
            returnval: u32,
        }

        let response: MaxPortCountResponse = self
            .channel
            .send("IStorageController_getMaxPortCount", Value::Null)
            .await?;
        self.max_port_count = response.returnval;
        Ok(self.max_port_count)
    }

    pub async fn set_port_count(&mut self, count: u32) -> Result<()> {
        #[derive(Serialize)]
        struct SetPortCountRequest {
            #[serde(rename = "portCount")]
            port_count: u32,
        }

        self.channel
            .send_no_result(
                "IStorageController_setPortCount",
                SetPortCountRequest { port_count: count },
            )
            .await?;
        self.port_count = count;
        Ok(())
    }

    /// Bus kind, decided locally from the cached display name. Only the four
    /// controller names the service creates by default are recognized; any
    /// other name, including a never-populated one, is rejected.
    pub fn get_storage_bus(&self) -> Result<StorageBus> {
        match self.name.as_str() {
            "IDE Controller" => Ok(StorageBus::Ide),
            "SATA Controller" => Ok(StorageBus::Sata),
            "SCSI" => Ok(StorageBus::Scsi),
            "SAS" => Ok(StorageBus::Sas),
            _ => Err(Error::Precondition("bad controller specified".into())),
        }
    }

    /// Lowest free port on this controller for `machine`.
    ///
    /// Fetches the port ceiling, collects the ports occupied by the
    /// machine's attachments on this controller, and scans ascending from
    /// zero.
    pub async fn get_next_available_port(&mut self, machine: &Machine) -> Result<i32> {
        let max_ports = self.get_max_port_count().await?;
        let attachments = machine
            .get_medium_attachments_of_controller(&self.name)
            .await?;
        let occupied: HashSet<i32> = attachments.iter().map(|a| a.port).collect();

        // Attachment ports are int32 on the wire; a ceiling past that is
        // not addressable.
        let max_ports = max_ports.min(i32::MAX as u32) as i32;
        (0..max_ports)
            .find(|port| !occupied.contains(port))
            .ok_or_else(|| Error::Precondition("no available ports".into()))
    }

    /// Releases this controller's reference, consuming the handle.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
