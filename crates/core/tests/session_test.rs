//! Session lock flow: locking and launching route through the machine with
//! the session as an argument, and remote rejections come back verbatim.


use serde_json::json;
use vbx::protocol::wire::result_codes;
use vbx::{Error, LockType};

use scripted_session::logon;

#[tokio::test]
async fn lock_machine_targets_the_machine_reference() {
    let (transport, vbox) = logon().await;
    transport.respond_returnval("IWebsessionManager_getSessionObject", "sess-1");
    transport.respond_returnval("IVirtualBox_findMachine", "m-1");
    transport.respond_ok("IMachine_lockMachine");

    let session = vbox.get_session().await.unwrap();
    let machine = vbox.find_machine("myvm").await.unwrap();
    session.lock_machine(&machine, LockType::Shared).await.unwrap();

    let requests = transport.requests_for("IMachine_lockMachine");
    assert_eq!(
        requests,
        vec![json!({
            "_this": "m-1",
            "session": "sess-1",
            "lockType": "Shared",
        })]
    );
}

#[tokio::test]
async fn launch_vm_process_is_headless() {
    let (transport, vbox) = logon().await;
    transport.respond_returnval("IWebsessionManager_getSessionObject", "sess-1");
    transport.respond_returnval("IVirtualBox_findMachine", "m-1");
    transport.respond_returnval("IMachine_launchVMProcess", "prog-1");

    let session = vbox.get_session().await.unwrap();
    let machine = vbox.find_machine("myvm").await.unwrap();
    let progress = session.launch_vm_process(&machine).await.unwrap();

    assert_eq!(progress.object_ref().as_str(), "prog-1");
    let requests = transport.requests_for("IMachine_launchVMProcess");
    assert_eq!(
        requests,
        vec![json!({
            "_this": "m-1",
            "session": "sess-1",
            "name": "headless",
            "environment": "",
        })]
    );
}

#[tokio::test]
async fn console_of_an_unlocked_session_is_a_remote_rejection() {
    let (transport, vbox) = logon().await;
    transport.respond_returnval("IWebsessionManager_getSessionObject", "sess-1");
    transport.fail(
        "ISession_getConsole",
        Some(result_codes::INVALID_SESSION_STATE),
        "The session is not locked",
    );

    let session = vbox.get_session().await.unwrap();
    let err = session.get_console().await.unwrap_err();

    assert!(matches!(err, Error::RemoteCall { .. }), "{err}");
    assert_eq!(err.result_code(), Some(result_codes::INVALID_SESSION_STATE));
    assert!(err.to_string().contains("not locked"), "{err}");
}

#[tokio::test]
async fn get_machine_returns_the_machine_under_lock() {
    let (transport, vbox) = logon().await;
    transport.respond_returnval("IWebsessionManager_getSessionObject", "sess-1");
    transport.respond_returnval("ISession_getMachine", "m-lock");

    let session = vbox.get_session().await.unwrap();
    let machine = session.get_machine().await.unwrap();

    assert_eq!(machine.object_ref().as_str(), "m-lock");
}

#[tokio::test]
async fn unlock_then_release_frees_the_session() {
    let (transport, vbox) = logon().await;
    transport.respond_returnval("IWebsessionManager_getSessionObject", "sess-1");
    transport.respond_ok("ISession_unlockMachine");
    transport.respond_ok("IManagedObjectRef_release");

    let session = vbox.get_session().await.unwrap();
    session.unlock_machine().await.unwrap();
    session.release().await.unwrap();

    assert_eq!(
        transport.requests_for("ISession_unlockMachine"),
        vec![json!({ "_this": "sess-1" })]
    );
    assert_eq!(
        transport.requests_for("IManagedObjectRef_release"),
        vec![json!({ "_this": "sess-1" })]
    );
}
