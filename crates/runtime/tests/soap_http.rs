//! Round trips for the SOAP transport against an in-process HTTP server.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use vbx_runtime::{Error, SoapTransport, Transport};

const VERSION_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/">
  <SOAP-ENV:Body>
    <vbox:IVirtualBox_getVersionResponse>
      <returnval>7.0.14</returnval>
    </vbox:IVirtualBox_getVersionResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

const NOT_FOUND_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Client</faultcode>
      <faultstring>Could not find a registered machine named 'ghost'</faultstring>
      <detail>
        <vbox:RuntimeFault xmlns:vbox="http://www.virtualbox.org/">
          <resultCode>0x80BB0001</resultCode>
        </vbox:RuntimeFault>
      </detail>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn invoke_posts_envelope_and_parses_response() {
    let seen_body: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let captured = seen_body.clone();
    let app = Router::new().route(
        "/",
        post(move |body: String| {
            let captured = captured.clone();
            async move {
                *captured.lock() = Some(body);
                VERSION_RESPONSE
            }
        }),
    );
    let endpoint = spawn_server(app).await;

    let transport = SoapTransport::new(&endpoint);
    let value = transport
        .invoke("IVirtualBox_getVersion", json!({ "_this": "vbox-0" }))
        .await
        .unwrap();
    assert_eq!(value, json!({ "returnval": "7.0.14" }));

    let body = seen_body.lock().take().expect("request body captured");
    assert!(body.contains("<vbox:IVirtualBox_getVersion>"), "{body}");
    assert!(body.contains("<_this>vbox-0</_this>"), "{body}");
}

#[tokio::test]
async fn fault_on_error_status_maps_to_remote_call() {
    let app = Router::new().route(
        "/",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, NOT_FOUND_FAULT) }),
    );
    let endpoint = spawn_server(app).await;

    let transport = SoapTransport::new(&endpoint);
    let err = transport
        .invoke("IVirtualBox_findMachine", json!({ "_this": "vbox-0", "nameOrId": "ghost" }))
        .await
        .unwrap_err();

    assert!(err.is_object_not_found(), "{err}");
    assert!(err.to_string().contains("ghost"), "{err}");
}

#[tokio::test]
async fn non_soap_error_body_reports_the_status() {
    let app = Router::new().route(
        "/",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
    );
    let endpoint = spawn_server(app).await;

    let transport = SoapTransport::new(&endpoint);
    let err = transport
        .invoke("IVirtualBox_getVersion", json!({ "_this": "vbox-0" }))
        .await
        .unwrap_err();

    match err {
        Error::Transport { operation, message } => {
            assert_eq!(operation, "IVirtualBox_getVersion");
            assert!(message.contains("502"), "{message}");
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Bind and drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = SoapTransport::new(format!("http://{addr}"));
    let err = transport
        .invoke("IVirtualBox_getVersion", json!({ "_this": "vbox-0" }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }), "{err}");
}
