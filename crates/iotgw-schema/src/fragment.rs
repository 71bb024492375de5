//! # Fragment Wrapper
//!
//! Per-protocol rules live under `connectors/*/type` + `connectors/*/params`
//! in the full-document grammar. A standalone protocol fragment is wrapped
//! into the smallest document that grammar accepts, so one grammar serves
//! both shapes:
//!
//! ```yaml
//! gateway: { name: frag, loglevel: info }
//! connectors:
//!   _frag: { type: <declared type>, params: <fragment params> }
//! bridges:
//!   _placeholder: { from: _frag, to: _frag }
//! ```
//!
//! The placeholder bridge carries no meaning, so cross-reference checks do
//! not run in fragment mode.

use serde_json::{json, Value};

use crate::loader::Document;

/// Id of the synthetic connector wrapping a bare params payload.
pub const FRAGMENT_CONNECTOR_ID: &str = "_frag";

/// Id of the placeholder self-loop bridge.
pub const PLACEHOLDER_BRIDGE_ID: &str = "_placeholder";

/// Connector types the gateway daemon knows how to run.
pub const KNOWN_PROTOCOLS: [&str; 14] = [
    "mqtt",
    "modbus-rtu",
    "modbus-tcp",
    "http-server",
    "uart",
    "spi",
    "i2c",
    "ble",
    "coap",
    "lorawan",
    "onewire",
    "opcua",
    "socketcan",
    "zigbee",
];

/// Whether `protocol` is one of [`KNOWN_PROTOCOLS`].
pub fn is_known_protocol(protocol: &str) -> bool {
    KNOWN_PROTOCOLS.contains(&protocol)
}

/// Protocol type implied by a template filename stem (`modbus_rtu` → `modbus-rtu`).
pub fn protocol_from_stem(stem: &str) -> String {
    stem.replace('_', "-")
}

/// Build a full document around `fragment`.
///
/// A fragment holding a `connectors` key is used as-is for that map, with
/// a placeholder bridge whose endpoints need not exist. Otherwise the
/// fragment's `params` (or the whole fragment, if it has none) becomes
/// the params of one connector of type `protocol`.
pub fn wrap_fragment(fragment: Value, protocol: &str) -> Document {
    if !is_known_protocol(protocol) {
        tracing::warn!(protocol, "fragment declared with an unknown protocol type");
    }

    let fragment = match fragment {
        Value::Null => Value::Object(Document::new()),
        other => other,
    };

    let wrapped = match fragment {
        Value::Object(mut map) if map.contains_key("connectors") => {
            let connectors = map.shift_remove("connectors").unwrap_or(Value::Null);
            json!({
                "gateway": placeholder_gateway(),
                "connectors": connectors,
                "bridges": { PLACEHOLDER_BRIDGE_ID: { "from": "x", "to": "x" } },
            })
        }
        other => {
            let params = match other {
                Value::Object(mut map) if map.contains_key("params") => {
                    map.shift_remove("params").unwrap_or(Value::Null)
                }
                other => other,
            };
            json!({
                "gateway": placeholder_gateway(),
                "connectors": {
                    FRAGMENT_CONNECTOR_ID: { "type": protocol, "params": params },
                },
                "bridges": {
                    PLACEHOLDER_BRIDGE_ID: {
                        "from": FRAGMENT_CONNECTOR_ID,
                        "to": FRAGMENT_CONNECTOR_ID,
                    },
                },
            })
        }
    };

    match wrapped {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn placeholder_gateway() -> Value {
    json!({ "name": "frag", "loglevel": "info" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_params_payload_becomes_connector() {
        let frag = json!({"params": {"client_id": "gw", "host": "broker.local"}});
        let doc = wrap_fragment(frag, "mqtt");
        assert_eq!(doc["connectors"]["_frag"]["type"], "mqtt");
        assert_eq!(doc["connectors"]["_frag"]["params"]["client_id"], "gw");
        assert_eq!(doc["bridges"]["_placeholder"], json!({"from": "_frag", "to": "_frag"}));
        assert_eq!(doc["gateway"], json!({"name": "frag", "loglevel": "info"}));
    }

    #[test]
    fn fragment_without_params_stands_in_for_params() {
        let frag = json!({"port": "/dev/ttyUSB0", "baudrate": 9600});
        let doc = wrap_fragment(frag.clone(), "uart");
        assert_eq!(doc["connectors"]["_frag"]["params"], frag);
    }

    #[test]
    fn null_fragment_is_empty_params() {
        let doc = wrap_fragment(Value::Null, "spi");
        assert_eq!(doc["connectors"]["_frag"], json!({"type": "spi", "params": {}}));
    }

    #[test]
    fn connectors_map_is_used_verbatim() {
        let connectors = json!({
            "a": {"type": "mqtt", "params": {}},
            "b": {"type": "uart", "params": {}},
        });
        let doc = wrap_fragment(json!({"connectors": connectors.clone(), "ignored": 1}), "zigbee");
        assert_eq!(doc["connectors"], connectors);
        assert_eq!(doc["bridges"]["_placeholder"], json!({"from": "x", "to": "x"}));
        assert!(!doc.contains_key("ignored"));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn non_mapping_fragment_is_passed_as_params() {
        let doc = wrap_fragment(json!(["not", "a", "map"]), "ble");
        assert_eq!(doc["connectors"]["_frag"]["params"], json!(["not", "a", "map"]));
    }

    #[test]
    fn unknown_protocol_still_wraps() {
        let doc = wrap_fragment(json!({}), "carrier-pigeon");
        assert_eq!(doc["connectors"]["_frag"]["type"], "carrier-pigeon");
    }

    #[test]
    fn protocol_names() {
        assert!(is_known_protocol("modbus-rtu"));
        assert!(!is_known_protocol("modbus_rtu"));
        assert_eq!(protocol_from_stem("http_server"), "http-server");
        assert_eq!(protocol_from_stem("mqtt"), "mqtt");
        for p in KNOWN_PROTOCOLS {
            assert!(is_known_protocol(&protocol_from_stem(&p.replace('-', "_"))));
        }
    }
}
