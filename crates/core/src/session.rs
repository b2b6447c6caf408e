//! Machine lock broker.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::console::Console;
use crate::machine::Machine;
use crate::progress::Progress;
use crate::virtualbox::VirtualBox;
use vbx_protocol::{LockType, ObjectRef};
use vbx_runtime::{Channel, Result};

/// Session object used to take and hold machine locks.
///
/// Locking goes through the machine: `lock_machine` and `launch_vm_process`
/// are `IMachine_*` operations with this session passed as an argument, so
/// they run on a channel bound to the machine's reference. The session keeps
/// no local lock state; whether a console or locked machine is available is
/// the service's call, and its rejections come back verbatim.
pub struct Session {
    vbox: Arc<VirtualBox>,
    channel: Channel,
}

impl Session {
    pub(crate) fn new(vbox: Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self { vbox, channel }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Locks `machine` into this session.
    pub async fn lock_machine(&self, machine: &Machine, lock_type: LockType) -> Result<()> {
        #[derive(Serialize)]
        struct LockMachineRequest<'a> {
            session: &'a ObjectRef,
            #[serde(rename = "lockType")]
            lock_type: LockType,
        }

        let machine_channel = self.vbox.channel_for(machine.object_ref().clone());
        machine_channel
            .send_no_result(
                "IMachine_lockMachine",
                LockMachineRequest {
                    session: self.channel.object_ref(),
                    lock_type,
                },
            )
            .await
    }

    /// Starts the machine's VM process headless and locks it into this
    /// session.
    pub async fn launch_vm_process(&self, machine: &Machine) -> Result<Progress> {
        #[derive(Serialize)]
        struct LaunchRequest<'a> {
            session: &'a ObjectRef,
            name: &'a str,
            environment: &'a str,
        }

        let machine_channel = self.vbox.channel_for(machine.object_ref().clone());
        let progress_ref: ObjectRef = machine_channel
            .send_returnval(
                "IMachine_launchVMProcess",
                LaunchRequest {
                    session: self.channel.object_ref(),
                    name: "headless",
                    environment: "",
                },
            )
            .await?;
        Ok(Progress::new(self.vbox.channel_for(progress_ref)))
    }

    /// Releases the machine lock held by this session.
    pub async fn unlock_machine(&self) -> Result<()> {
        self.channel
            .send_no_result("ISession_unlockMachine", Value::Null)
            .await
    }

    /// Console of the machine locked into this session. Meaningful only
    /// after a successful launch; earlier calls fail remotely.
    pub async fn get_console(&self) -> Result<Console> {
        let console_ref: ObjectRef = self.channel.fetch("ISession_getConsole").await?;
        Ok(Console::new(Arc::clone(&self.vbox), console_ref))
    }

    /// Session-local machine handle, for mutating a machine under lock.
    pub async fn get_machine(&self) -> Result<Machine> {
        let machine_ref: ObjectRef = self.channel.fetch("ISession_getMachine").await?;
        Ok(Machine::new(Arc::clone(&self.vbox), machine_ref))
    }

    /// Releases the session's own reference, consuming the handle. Call
    /// [`unlock_machine`](Session::unlock_machine) first for an orderly
    /// unlock; otherwise the service cleans the lock up on logoff.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
