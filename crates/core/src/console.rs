//! Control surface of a running VM.

use serde::Serialize;
use std::sync::Arc;

use crate::progress::Progress;
use crate::virtualbox::VirtualBox;
use vbx_protocol::ObjectRef;
use vbx_runtime::{Channel, Result};

/// Console of a powered or powering VM, obtained from a locked session.
#[derive(Debug)]
pub struct Console {
    vbox: Arc<VirtualBox>,
    channel: Channel,
}

impl Console {
    pub(crate) fn new(vbox: Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self { vbox, channel }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Powers the VM down; completion is tracked by the returned progress.
    pub async fn power_down(&self) -> Result<Progress> {
        let progress_ref: ObjectRef = self.channel.fetch("IConsole_powerDown").await?;
        Ok(Progress::new(self.vbox.channel_for(progress_ref)))
    }

    /// Powers the VM up.
    pub async fn power_up(&self) -> Result<Progress> {
        let progress_ref: ObjectRef = self.channel.fetch("IConsole_powerUp").await?;
        Ok(Progress::new(self.vbox.channel_for(progress_ref)))
    }

    /// Takes a snapshot of the machine's current state and returns the new
    /// snapshot's ID. Resolve it into an entity with
    /// [`Machine::find_snapshot`](crate::Machine::find_snapshot).
    pub async fn take_snapshot(&self, name: &str, description: &str) -> Result<String> {
        #[derive(Serialize)]
        struct TakeSnapshotRequest<'a> {
            name: &'a str,
            description: &'a str,
        }

        self.channel
            .send_returnval(
                "IConsole_takeSnapshot",
                TakeSnapshotRequest { name, description },
            )
            .await
    }

    /// Releases the console reference, consuming the handle.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
