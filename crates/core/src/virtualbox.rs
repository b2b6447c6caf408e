//! Root handle for an authenticated web service session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::machine::Machine;
use crate::medium::Medium;
use crate::session::Session;
use vbx_protocol::ObjectRef;
use vbx_protocol::wire::{self, Returnval};
use vbx_runtime::{Channel, Connection, Error, Result};

/// Authenticated root of the API object graph.
///
/// [`logon`] trades credentials for the root `IVirtualBox` reference; every
/// other entity is reached from here and shares this connection. References
/// minted in the session stay live until [`logoff`] or an explicit release.
///
/// [`logon`]: VirtualBox::logon
/// [`logoff`]: VirtualBox::logoff
#[derive(Debug)]
pub struct VirtualBox {
    channel: Channel,
}

impl VirtualBox {
    /// Authenticates against the websession manager and returns the root
    /// handle.
    ///
    /// The service raises a plain fault for bad credentials rather than a
    /// dedicated result code, so any fault from the logon call is reported
    /// as [`Error::Authentication`].
    pub async fn logon(
        connection: Arc<Connection>,
        username: &str,
        password: &str,
    ) -> Result<Arc<Self>> {
        #[derive(Serialize)]
        struct LogonRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        let request = serde_json::to_value(LogonRequest { username, password })?;
        let response = connection
            .invoke("IWebsessionManager_logon", request)
            .await
            .map_err(|err| match err {
                Error::RemoteCall { message, .. } => Error::Authentication(message),
                other => other,
            })?;
        let root = returnval_ref("IWebsessionManager_logon", response)?;
        if root.is_null() {
            return Err(Error::envelope(
                "IWebsessionManager_logon",
                "empty virtualbox reference",
            ));
        }

        tracing::debug!(target: "vbx", "logged on");
        let channel = Channel::new(root, connection);
        Ok(Arc::new(Self { channel }))
    }

    /// Ends the session. Every reference minted in it, including the root
    /// one, becomes dangling.
    pub async fn logoff(&self) -> Result<()> {
        let request = serde_json::to_value(BySessionRoot {
            virtual_box: self.channel.object_ref(),
        })?;
        self.channel
            .connection()
            .invoke("IWebsessionManager_logoff", request)
            .await?;
        tracing::debug!(target: "vbx", "logged off");
        Ok(())
    }

    /// Fresh session object for machine locking.
    pub async fn get_session(self: &Arc<Self>) -> Result<Session> {
        let request = serde_json::to_value(BySessionRoot {
            virtual_box: self.channel.object_ref(),
        })?;
        let response = self
            .channel
            .connection()
            .invoke("IWebsessionManager_getSessionObject", request)
            .await?;
        let session_ref = returnval_ref("IWebsessionManager_getSessionObject", response)?;
        Ok(Session::new(Arc::clone(self), session_ref))
    }

    /// Service version string, e.g. `"7.0.14"`.
    pub async fn get_version(&self) -> Result<String> {
        self.channel.fetch("IVirtualBox_getVersion").await
    }

    /// Looks up a registered machine by name or UUID.
    ///
    /// Only the service's "object not found" result code maps to
    /// [`Error::NotFound`]; any other fault passes through untouched.
    pub async fn find_machine(self: &Arc<Self>, name_or_id: &str) -> Result<Machine> {
        #[derive(Serialize)]
        struct FindMachineRequest<'a> {
            #[serde(rename = "nameOrId")]
            name_or_id: &'a str,
        }

        let machine_ref: ObjectRef = self
            .channel
            .send_returnval("IVirtualBox_findMachine", FindMachineRequest { name_or_id })
            .await
            .map_err(|err| {
                if err.is_object_not_found() {
                    Error::NotFound(format!("machine {name_or_id:?}"))
                } else {
                    err
                }
            })?;
        Ok(Machine::new(Arc::clone(self), machine_ref))
    }

    /// All registered machines, one fresh reference each.
    pub async fn get_machines(self: &Arc<Self>) -> Result<Vec<Machine>> {
        #[derive(Deserialize)]
        struct MachinesResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<ObjectRef>,
        }

        let response: MachinesResponse = self
            .channel
            .send("IVirtualBox_getMachines", Value::Null)
            .await?;
        Ok(response
            .returnval
            .into_iter()
            .map(|machine_ref| Machine::new(Arc::clone(self), machine_ref))
            .collect())
    }

    /// Registers a new hard-disk medium at `location` without allocating
    /// any storage; pair with [`Medium::create_base_storage`].
    pub async fn create_hard_disk(
        self: &Arc<Self>,
        format: &str,
        location: &str,
    ) -> Result<Medium> {
        #[derive(Serialize)]
        struct CreateHardDiskRequest<'a> {
            format: &'a str,
            location: &'a str,
        }

        let medium_ref: ObjectRef = self
            .channel
            .send_returnval(
                "IVirtualBox_createHardDisk",
                CreateHardDiskRequest { format, location },
            )
            .await?;
        Ok(Medium::new(Arc::clone(self), medium_ref))
    }

    /// All registered hard-disk media.
    pub async fn get_hard_disks(self: &Arc<Self>) -> Result<Vec<Medium>> {
        #[derive(Deserialize)]
        struct HardDisksResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<ObjectRef>,
        }

        let response: HardDisksResponse = self
            .channel
            .send("IVirtualBox_getHardDisks", Value::Null)
            .await?;
        Ok(response
            .returnval
            .into_iter()
            .map(|medium_ref| Medium::new(Arc::clone(self), medium_ref))
            .collect())
    }

    /// Releases an arbitrary reference held by this session.
    pub async fn release(&self, object_ref: &ObjectRef) -> Result<()> {
        self.channel.connection().release(object_ref).await
    }

    /// Reference of the root object itself.
    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    pub(crate) fn channel_for(&self, object_ref: ObjectRef) -> Channel {
        Channel::new(object_ref, Arc::clone(self.channel.connection()))
    }
}

/// Parameter shape shared by the websession-manager operations that take the
/// root reference by name instead of `_this`.
#[derive(Serialize)]
struct BySessionRoot<'a> {
    #[serde(rename = "refIVirtualBox")]
    virtual_box: &'a ObjectRef,
}

fn returnval_ref(operation: &str, response: Value) -> Result<ObjectRef> {
    let parsed: Returnval<ObjectRef> =
        serde_json::from_value(response).map_err(|err| Error::envelope(operation, err))?;
    Ok(parsed.returnval)
}
