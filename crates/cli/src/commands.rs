use std::sync::Arc;

use tracing::{info, warn};
use vbx::{Connection, SoapTransport, VirtualBox};

use crate::cli::Cli;

/// Logs on to the endpoint, prints the reported service version, and logs
/// off again. Credentials come from `VBX_USERNAME` / `VBX_PASSWORD`; with
/// vboxwebsrv running without an auth library, empty ones are accepted.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let username = std::env::var("VBX_USERNAME").unwrap_or_default();
    let password = std::env::var("VBX_PASSWORD").unwrap_or_default();

    let transport = SoapTransport::new(&cli.endpoint);
    let connection = Arc::new(Connection::new(Box::new(transport)));
    let vbox = VirtualBox::logon(connection, &username, &password).await?;

    let version = vbox.get_version().await?;
    info!(target = "vbx", endpoint = %cli.endpoint, %version, "connected");
    println!("VirtualBox web service {version}");

    if let Err(err) = vbox.logoff().await {
        warn!(target = "vbx", error = %err, "logoff failed");
    }
    Ok(())
}
