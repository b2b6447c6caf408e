//! SOAP 1.1 transport for vboxwebsrv.
//!
//! Every operation is one document/literal POST: the request struct
//! renders as an ordered element sequence inside the operation element,
//! and the response body reduces to a JSON value keyed by local element
//! names. Faults are parsed from the body even when the HTTP status is an
//! error, because the service reports API failures as status 500 with a
//! fault envelope.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{InvokeFuture, Transport};
use vbx_protocol::wire;

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const VBOX_NS: &str = "http://www.virtualbox.org/";

/// HTTP SOAP client for one service endpoint.
pub struct SoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl SoapTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Client with a per-request timeout, for callers that must not hang on
    /// an unresponsive service.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::transport("client setup", err))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for SoapTransport {
    fn invoke(&self, operation: &str, request: Value) -> InvokeFuture<'_> {
        let operation = operation.to_owned();
        Box::pin(async move {
            let body = render_envelope(&operation, &request)?;
            tracing::trace!(target: "vbx::soap", %operation, bytes = body.len(), "posting envelope");

            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .header("SOAPAction", "\"\"")
                .body(body)
                .send()
                .await
                .map_err(|err| Error::transport(&operation, err))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| Error::transport(&operation, err))?;

            match parse_envelope(&operation, &text) {
                Ok(value) => Ok(value),
                Err(err @ Error::RemoteCall { .. }) => Err(err),
                Err(err) if status.is_success() => Err(err),
                // Unparseable body on an error status: the status line is
                // the more useful diagnostic.
                Err(_) => Err(Error::transport(&operation, format!("HTTP status {status}"))),
            }
        })
    }
}

/// Renders the request envelope for `operation`.
///
/// `request` must be a JSON object; its entries become child elements in
/// iteration order, which the `preserve_order` feature keeps equal to the
/// declaration order of the serialized parameter struct. Arrays render as
/// repeated elements, nested objects as nested element sequences, and
/// `null` entries are omitted.
pub fn render_envelope(operation: &str, request: &Value) -> Result<String> {
    let Value::Object(params) = request else {
        return Err(Error::envelope(operation, "request payload must be a JSON object"));
    };

    let mut body = String::new();
    for (name, value) in params {
        write_param(&mut body, name, value);
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\" xmlns:vbox=\"{VBOX_NS}\">\
         <SOAP-ENV:Body>\
         <vbox:{operation}>{body}</vbox:{operation}>\
         </SOAP-ENV:Body>\
         </SOAP-ENV:Envelope>"
    ))
}

fn write_param(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                write_param(out, name, item);
            }
        }
        Value::Object(fields) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            for (child, child_value) in fields {
                write_param(out, child, child_value);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Value::String(text) => write_text_element(out, name, text),
        Value::Bool(flag) => write_text_element(out, name, if *flag { "true" } else { "false" }),
        Value::Number(number) => write_text_element(out, name, &number.to_string()),
    }
}

fn write_text_element(out: &mut String, name: &str, text: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape(text));
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Reduces a response envelope to the body of `<{operation}Response>`.
///
/// Element text becomes strings, nested elements become objects, and a
/// repeated element name collapses into an array. Namespace prefixes are
/// dropped; only local names reach the caller. A `<Fault>` element maps to
/// [`Error::RemoteCall`] with the fault string and the normalized
/// `resultCode` from the fault detail.
pub fn parse_envelope(operation: &str, body: &str) -> Result<Value> {
    let mut reader = Reader::from_str(body);
    let mut buf = Vec::new();
    let response_tag = format!("{operation}Response");

    enum Found {
        Element(String),
        SelfClosed(String),
        Eof,
        Skip,
    }

    loop {
        let found = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => Found::Element(local_name(e.name().as_ref())),
            Ok(Event::Empty(e)) => Found::SelfClosed(local_name(e.name().as_ref())),
            Ok(Event::Eof) => Found::Eof,
            Ok(_) => Found::Skip,
            Err(err) => return Err(Error::envelope(operation, err)),
        };
        buf.clear();

        match found {
            Found::Element(name) if name == response_tag => {
                let value = element_value(&mut reader, &mut buf, operation)?;
                // A void response is an empty element; normalize it to an
                // empty object so response structs with defaults apply.
                return Ok(match value {
                    Value::String(text) if text.is_empty() => Value::Object(Map::new()),
                    other => other,
                });
            }
            Found::Element(name) if name == "Fault" => {
                let fault = element_value(&mut reader, &mut buf, operation)?;
                return Err(fault_error(operation, &fault));
            }
            Found::SelfClosed(name) if name == response_tag => {
                return Ok(Value::Object(Map::new()));
            }
            Found::Eof => {
                return Err(Error::envelope(operation, "response element not found"));
            }
            _ => {}
        }
    }
}

/// Collects the content of the element whose `Start` was just consumed,
/// through its matching `End`.
fn element_value<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    operation: &str,
) -> Result<Value> {
    let mut children: Map<String, Value> = Map::new();
    let mut text = String::new();

    enum Step {
        Child(String),
        EmptyChild(String),
        Text(String),
        End,
        Skip,
    }

    loop {
        let step = match reader.read_event_into(buf) {
            Ok(Event::Start(e)) => Step::Child(local_name(e.name().as_ref())),
            Ok(Event::Empty(e)) => Step::EmptyChild(local_name(e.name().as_ref())),
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(unescaped) => Step::Text(unescaped.into_owned()),
                Err(err) => return Err(Error::envelope(operation, err)),
            },
            Ok(Event::CData(t)) => Step::Text(String::from_utf8_lossy(t.as_ref()).into_owned()),
            Ok(Event::End(_)) => Step::End,
            Ok(Event::Eof) => {
                return Err(Error::envelope(operation, "unexpected end of document"));
            }
            Ok(_) => Step::Skip,
            Err(err) => return Err(Error::envelope(operation, err)),
        };
        buf.clear();

        match step {
            Step::Child(name) => {
                let value = element_value(reader, buf, operation)?;
                insert_child(&mut children, name, value);
            }
            Step::EmptyChild(name) => {
                insert_child(&mut children, name, Value::String(String::new()));
            }
            Step::Text(chunk) => text.push_str(&chunk),
            Step::End => break,
            Step::Skip => {}
        }
    }

    if children.is_empty() {
        Ok(Value::String(text.trim().to_owned()))
    } else {
        Ok(Value::Object(children))
    }
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

fn fault_error(operation: &str, fault: &Value) -> Error {
    let message = fault
        .get("faultstring")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("unspecified fault")
        .to_owned();
    let code = fault
        .get("detail")
        .and_then(find_result_code)
        .map(|raw| wire::normalize_result_code(&raw));

    Error::RemoteCall {
        operation: operation.to_owned(),
        code,
        message,
    }
}

/// Searches a fault detail subtree for a `resultCode` element.
fn find_result_code(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            match map.get("resultCode") {
                Some(Value::String(code)) => return Some(code.clone()),
                Some(Value::Number(code)) => return Some(code.to_string()),
                _ => {}
            }
            map.values().find_map(find_result_code)
        }
        Value::Array(items) => items.iter().find_map(find_result_code),
        _ => None,
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_owned(),
        None => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_wraps_operation_and_keeps_parameter_order() {
        let body = render_envelope(
            "IWebsessionManager_logon",
            &json!({ "username": "tester", "password": "secret" }),
        )
        .unwrap();

        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(body.contains("<vbox:IWebsessionManager_logon>"));
        assert!(body.contains("<username>tester</username><password>secret</password>"));
        assert!(body.contains("</vbox:IWebsessionManager_logon>"));
    }

    #[test]
    fn render_escapes_text_content() {
        let body = render_envelope(
            "IWebsessionManager_logon",
            &json!({ "username": "a<b&c", "password": "\"quoted\"" }),
        )
        .unwrap();

        assert!(body.contains("<username>a&lt;b&amp;c</username>"));
        assert!(!body.contains("a<b&c"));
    }

    #[test]
    fn render_repeats_array_elements_and_skips_nulls() {
        let body = render_envelope(
            "IMedium_createBaseStorage",
            &json!({
                "_this": "medium-1",
                "logicalSize": 1048576,
                "variant": ["Standard", "Fixed"],
                "unused": null,
            }),
        )
        .unwrap();

        assert!(body.contains(
            "<logicalSize>1048576</logicalSize><variant>Standard</variant><variant>Fixed</variant>"
        ));
        assert!(!body.contains("unused"));
    }

    #[test]
    fn render_nests_object_parameters() {
        let body = render_envelope(
            "IMachine_attachDevice",
            &json!({ "slot": { "port": 1, "device": 0 } }),
        )
        .unwrap();

        assert!(body.contains("<slot><port>1</port><device>0</device></slot>"));
    }

    #[test]
    fn render_rejects_non_object_payload() {
        let err = render_envelope("IMachine_getName", &json!("m-1")).unwrap_err();
        assert!(matches!(err, Error::Envelope { .. }), "{err}");
    }

    #[test]
    fn parse_extracts_scalar_returnval() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/">
  <SOAP-ENV:Body>
    <vbox:IMachine_getNameResponse>
      <returnval>ubuntu-dev</returnval>
    </vbox:IMachine_getNameResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

        let value = parse_envelope("IMachine_getName", body).unwrap();
        assert_eq!(value, json!({ "returnval": "ubuntu-dev" }));
    }

    #[test]
    fn parse_collapses_repeated_elements_into_arrays() {
        let body = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <vbox:IVirtualBox_getMachinesResponse xmlns:vbox="http://www.virtualbox.org/">
      <returnval>m-1</returnval>
      <returnval>m-2</returnval>
      <returnval>m-3</returnval>
    </vbox:IVirtualBox_getMachinesResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

        let value = parse_envelope("IVirtualBox_getMachines", body).unwrap();
        assert_eq!(value, json!({ "returnval": ["m-1", "m-2", "m-3"] }));
    }

    #[test]
    fn parse_builds_nested_objects() {
        let body = r#"<e:Envelope xmlns:e="http://schemas.xmlsoap.org/soap/envelope/">
  <e:Body>
    <IMachine_getMediumAttachmentsResponse>
      <returnval>
        <medium>med-1</medium>
        <controller>SATA Controller</controller>
        <port>0</port>
        <device>0</device>
        <type>HardDisk</type>
        <passthrough>false</passthrough>
      </returnval>
    </IMachine_getMediumAttachmentsResponse>
  </e:Body>
</e:Envelope>"#;

        let value = parse_envelope("IMachine_getMediumAttachments", body).unwrap();
        assert_eq!(
            value,
            json!({
                "returnval": {
                    "medium": "med-1",
                    "controller": "SATA Controller",
                    "port": "0",
                    "device": "0",
                    "type": "HardDisk",
                    "passthrough": "false",
                }
            })
        );
    }

    #[test]
    fn parse_void_response_shapes() {
        let explicit = r#"<Envelope><Body>
            <IMachine_saveSettingsResponse></IMachine_saveSettingsResponse>
        </Body></Envelope>"#;
        assert_eq!(parse_envelope("IMachine_saveSettings", explicit).unwrap(), json!({}));

        let self_closed = r#"<Envelope><Body>
            <IMachine_saveSettingsResponse/>
        </Body></Envelope>"#;
        assert_eq!(parse_envelope("IMachine_saveSettings", self_closed).unwrap(), json!({}));
    }

    #[test]
    fn parse_preserves_empty_leaf_elements() {
        let body = r#"<Envelope><Body>
            <IMedium_getParentResponse><returnval/></IMedium_getParentResponse>
        </Body></Envelope>"#;

        let value = parse_envelope("IMedium_getParent", body).unwrap();
        assert_eq!(value, json!({ "returnval": "" }));
    }

    #[test]
    fn parse_fault_maps_to_remote_call_with_code() {
        let body = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Client</faultcode>
      <faultstring>Could not find a registered machine named 'ghost'</faultstring>
      <detail>
        <vbox:RuntimeFault xmlns:vbox="http://www.virtualbox.org/">
          <resultCode>0x80BB0001</resultCode>
          <interfaceID>00000000-0000-0000-0000-000000000000</interfaceID>
        </vbox:RuntimeFault>
      </detail>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

        let err = parse_envelope("IVirtualBox_findMachine", body).unwrap_err();
        match err {
            Error::RemoteCall { operation, code, message } => {
                assert_eq!(operation, "IVirtualBox_findMachine");
                assert_eq!(code.as_deref(), Some("0x80bb0001"));
                assert!(message.contains("ghost"));
            }
            other => panic!("expected RemoteCall, got {other:?}"),
        }
    }

    #[test]
    fn parse_fault_accepts_decimal_result_code() {
        let body = r#"<Envelope><Body><Fault>
            <faultstring>access denied</faultstring>
            <detail><RuntimeFault><resultCode>-2135228415</resultCode></RuntimeFault></detail>
        </Fault></Body></Envelope>"#;

        let err = parse_envelope("IWebsessionManager_logon", body).unwrap_err();
        assert_eq!(err.result_code(), Some("0x80bb0001"));
    }

    #[test]
    fn parse_fault_without_detail_keeps_message() {
        let body = r#"<Envelope><Body><Fault>
            <faultcode>Server</faultcode>
            <faultstring>internal error</faultstring>
        </Fault></Body></Envelope>"#;

        let err = parse_envelope("IMachine_saveSettings", body).unwrap_err();
        match err {
            Error::RemoteCall { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "internal error");
            }
            other => panic!("expected RemoteCall, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_response_element_is_envelope_error() {
        let body = r#"<Envelope><Body>
            <SomeOtherResponse><returnval>x</returnval></SomeOtherResponse>
        </Body></Envelope>"#;

        let err = parse_envelope("IMachine_getName", body).unwrap_err();
        assert!(matches!(err, Error::Envelope { .. }), "{err}");
    }

    #[test]
    fn parse_unescapes_text() {
        let body = r#"<Envelope><Body>
            <IMachine_getNameResponse><returnval>a&lt;b&amp;c</returnval></IMachine_getNameResponse>
        </Body></Envelope>"#;

        let value = parse_envelope("IMachine_getName", body).unwrap();
        assert_eq!(value, json!({ "returnval": "a<b&c" }));
    }
}
