//! Saved machine state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::virtualbox::VirtualBox;
use vbx_protocol::ObjectRef;
use vbx_protocol::wire;
use vbx_runtime::{Channel, Result};

/// One snapshot in a machine's snapshot tree.
///
/// The tree is not traversed at this layer: children are only counted, and
/// walking further means repeated lookups by the caller.
pub struct Snapshot {
    vbox: Arc<VirtualBox>,
    channel: Channel,
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Snapshot {
    pub(crate) fn new(vbox: Arc<VirtualBox>, object_ref: ObjectRef) -> Self {
        let channel = vbox.channel_for(object_ref);
        Self {
            vbox,
            channel,
            id: String::new(),
            name: String::new(),
            description: String::new(),
        }
    }

    pub fn object_ref(&self) -> &ObjectRef {
        self.channel.object_ref()
    }

    /// Snapshot UUID; cached on success.
    pub async fn get_id(&mut self) -> Result<String> {
        self.id = self.channel.fetch("ISnapshot_getId").await?;
        Ok(self.id.clone())
    }

    pub async fn get_name(&mut self) -> Result<String> {
        self.name = self.channel.fetch("ISnapshot_getName").await?;
        Ok(self.name.clone())
    }

    pub async fn get_description(&mut self) -> Result<String> {
        self.description = self.channel.fetch("ISnapshot_getDescription").await?;
        Ok(self.description.clone())
    }

    /// Renames the snapshot; the local cache updates only on success.
    pub async fn set_name(&mut self, name: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SetNameRequest<'a> {
            name: &'a str,
        }

        self.channel
            .send_no_result("ISnapshot_setName", SetNameRequest { name })
            .await?;
        self.name = name.to_owned();
        Ok(())
    }

    pub async fn set_description(&mut self, description: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SetDescriptionRequest<'a> {
            description: &'a str,
        }

        self.channel
            .send_no_result("ISnapshot_setDescription", SetDescriptionRequest { description })
            .await?;
        self.description = description.to_owned();
        Ok(())
    }

    /// Number of direct children.
    ///
    /// The child references the service returns are only counted; every one
    /// of them is released before this returns, and the first release
    /// failure is surfaced after all of them have been attempted.
    pub async fn get_children_count(&self) -> Result<usize> {
        #[derive(Deserialize)]
        struct ChildrenResponse {
            #[serde(default, deserialize_with = "wire::one_or_many")]
            returnval: Vec<ObjectRef>,
        }

        let response: ChildrenResponse = self
            .channel
            .send("ISnapshot_getChildren", Value::Null)
            .await?;
        let count = response.returnval.len();

        let mut first_err = None;
        for child_ref in &response.returnval {
            if let Err(err) = self.vbox.release(child_ref).await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Releases this snapshot's reference, consuming the handle.
    pub async fn release(self) -> Result<()> {
        self.channel.release().await
    }
}
