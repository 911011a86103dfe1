//! Socket.IO v5 over Engine.IO v4, text frames only.
//!
//! Each WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its payload. Engine `message` packets (`4`) carry one
//! Socket.IO packet:
//!
//! ```text
//! <type>[<namespace>,][<ack id>][<json>]
//!
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   engine open
//! 2 / 3                                                      ping / pong
//! 40{"token":"..."}                                          socket connect
//! 42["new_waiter_call",{"callId":"A"}]                       socket event
//! 42/staff,7["joinRestaurantRoom","r1"]                      namespaced, with ack id
//! ```
//!
//! Binary attachments are not used by this backend and are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use waiterdesk_core::prelude::*;

/// Path the Socket.IO server is mounted on.
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// The root namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

/// Payload of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the client may go without a server ping before the
    /// connection is considered lost.
    pub fn ping_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFrame {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

impl EngineFrame {
    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::protocol("empty engine frame"))?;
        let rest = chars.as_str();
        match kind {
            '0' => serde_json::from_str(rest)
                .map(EngineFrame::Open)
                .map_err(|e| Error::protocol(format!("invalid open packet: {e}"))),
            '1' => Ok(EngineFrame::Close),
            '2' => Ok(EngineFrame::Ping),
            '3' => Ok(EngineFrame::Pong),
            '4' => Ok(EngineFrame::Message(rest.to_string())),
            '5' => Ok(EngineFrame::Upgrade),
            '6' => Ok(EngineFrame::Noop),
            other => Err(Error::protocol(format!("unknown engine packet type '{other}'"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EngineFrame::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EngineFrame::Close => "1".to_string(),
            EngineFrame::Ping => "2".to_string(),
            EngineFrame::Pong => "3".to_string(),
            EngineFrame::Message(payload) => format!("4{payload}"),
            EngineFrame::Upgrade => "5".to_string(),
            EngineFrame::Noop => "6".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// An event on `namespace` with a single argument.
    pub fn event(namespace: &str, name: &str, payload: Value) -> Self {
        SocketPacket::Event {
            namespace: namespace.to_string(),
            ack_id: None,
            name: name.to_string(),
            args: vec![payload],
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::protocol("empty socket packet"))?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let (nsp, tail) = match rest.find(',') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            };
            rest = tail;
            nsp.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| Error::protocol(format!("invalid ack id: {e}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(rest)
                    .map_err(|e| Error::protocol(format!("invalid packet data: {e}")))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(args)) => args,
                    _ => return Err(Error::protocol("event packet without argument array")),
                };
                if args.is_empty() {
                    return Err(Error::protocol("event packet without a name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(Error::protocol(format!("event name is not a string: {other}")))
                    }
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => {
                let ack_id = ack_id.ok_or_else(|| Error::protocol("ack packet without id"))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    None => Vec::new(),
                    Some(other) => vec![other],
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => {
                let message = match data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Some(Value::String(message)) => message,
                    _ => "connection refused".to_string(),
                };
                Ok(SocketPacket::ConnectError { namespace, message })
            }
            '5' | '6' => Err(Error::protocol("binary packets are not supported")),
            other => Err(Error::protocol(format!("unknown socket packet type '{other}'"))),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, namespace) = match self {
            SocketPacket::Connect { namespace, .. } => ('0', namespace),
            SocketPacket::Disconnect { namespace } => ('1', namespace),
            SocketPacket::Event { namespace, .. } => ('2', namespace),
            SocketPacket::Ack { namespace, .. } => ('3', namespace),
            SocketPacket::ConnectError { namespace, .. } => ('4', namespace),
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            SocketPacket::Connect { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
            }
            SocketPacket::Disconnect { .. } => {}
            SocketPacket::Event {
                ack_id, name, args, ..
            } => {
                if let Some(id) = ack_id {
                    out.push_str(&id.to_string());
                }
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                out.push_str(&Value::Array(array).to_string());
            }
            SocketPacket::Ack { ack_id, args, .. } => {
                out.push_str(&ack_id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
            }
            SocketPacket::ConnectError { message, .. } => {
                out.push_str(&serde_json::json!({ "message": message }).to_string());
            }
        }
        out
    }

    /// Wrap in an Engine.IO message frame, ready for the wire.
    pub fn to_frame(&self) -> String {
        EngineFrame::Message(self.encode()).encode()
    }
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// WebSocket endpoint for a Socket.IO server at `base`.
///
/// `http`/`https` map to `ws`/`wss`. The base path is not part of the engine
/// path; see [`namespace_from_url`].
pub fn websocket_url(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "unsupported realtime URL scheme '{other}'"
            )))
        }
    };
    let host = base
        .host_str()
        .ok_or_else(|| Error::config(format!("realtime URL '{base}' has no host")))?;

    let mut url = Url::parse(&format!("{scheme}://{host}{SOCKET_IO_PATH}"))
        .map_err(|e| Error::config(format!("invalid realtime URL: {e}")))?;
    url.set_port(base.port())
        .map_err(|_| Error::config(format!("realtime URL '{base}' cannot carry a port")))?;
    url.query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

/// A path on the server URL names the namespace, as Socket.IO clients do.
pub fn namespace_from_url(base: &Url) -> String {
    let path = base.path().trim_end_matches('/');
    if path.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let frame = EngineFrame::parse(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        match frame {
            EngineFrame::Open(handshake) => {
                assert_eq!(handshake.sid, "abc");
                assert_eq!(handshake.ping_deadline().as_millis(), 45000);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_parse_engine_control_frames() {
        assert_eq!(EngineFrame::parse("2").unwrap(), EngineFrame::Ping);
        assert_eq!(EngineFrame::parse("3").unwrap(), EngineFrame::Pong);
        assert_eq!(EngineFrame::parse("1").unwrap(), EngineFrame::Close);
        assert_eq!(
            EngineFrame::parse("440").unwrap(),
            EngineFrame::Message("40".into())
        );
        assert!(EngineFrame::parse("").is_err());
        assert!(EngineFrame::parse("9").is_err());
    }

    #[test]
    fn test_parse_event() {
        let packet = SocketPacket::parse(r#"2["new_waiter_call",{"callId":"A"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".into(),
                ack_id: None,
                name: "new_waiter_call".into(),
                args: vec![json!({"callId": "A"})],
            }
        );
    }

    #[test]
    fn test_parse_namespaced_event_with_ack() {
        let packet = SocketPacket::parse(r#"2/staff,12["ping",1,2]"#).unwrap();
        match packet {
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            } => {
                assert_eq!(namespace, "/staff");
                assert_eq!(ack_id, Some(12));
                assert_eq!(name, "ping");
                assert_eq!(args, vec![json!(1), json!(2)]);
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_parse_connect_variants() {
        assert_eq!(
            SocketPacket::parse("0").unwrap(),
            SocketPacket::Connect {
                namespace: "/".into(),
                data: None
            }
        );
        let packet = SocketPacket::parse(r#"0{"sid":"xyz"}"#).unwrap();
        assert!(matches!(packet, SocketPacket::Connect { data: Some(_), .. }));
        assert_eq!(
            SocketPacket::parse("1/staff,").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/staff".into()
            }
        );
    }

    #[test]
    fn test_parse_connect_error() {
        let packet = SocketPacket::parse(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::ConnectError {
                namespace: "/".into(),
                message: "Not authorized".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_events() {
        assert!(SocketPacket::parse("2").is_err());
        assert!(SocketPacket::parse("2[]").is_err());
        assert!(SocketPacket::parse("2[42]").is_err());
        assert!(SocketPacket::parse("2[\"x\"").is_err());
        assert!(SocketPacket::parse(r#"51-["upload",{"_placeholder":true,"num":0}]"#).is_err());
    }

    #[test]
    fn test_encode_connect_with_auth() {
        let packet = SocketPacket::Connect {
            namespace: "/".into(),
            data: Some(json!({"token": "t"})),
        };
        assert_eq!(packet.to_frame(), r#"40{"token":"t"}"#);
    }

    #[test]
    fn test_encode_event_in_namespace() {
        let packet = SocketPacket::event("/staff", "joinRestaurantRoom", json!("r1"));
        assert_eq!(packet.encode(), r#"2/staff,["joinRestaurantRoom","r1"]"#);
    }

    #[test]
    fn test_encode_ack() {
        let packet = SocketPacket::Ack {
            namespace: "/".into(),
            ack_id: 5,
            args: vec![],
        };
        assert_eq!(packet.to_frame(), "435[]");
    }

    #[test]
    fn test_event_survives_encode_parse() {
        let packet = SocketPacket::Event {
            namespace: "/".into(),
            ack_id: Some(3),
            name: "waiter_call_status_updated".into(),
            args: vec![json!({"callId": "A", "status": "resolved"})],
        };
        assert_eq!(SocketPacket::parse(&packet.encode()).unwrap(), packet);
    }

    #[test]
    fn test_websocket_url() {
        let url = websocket_url(&Url::parse("https://api.example.com/staff").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://api.example.com/socket.io/?EIO=4&transport=websocket"
        );

        let url = websocket_url(&Url::parse("http://127.0.0.1:3000").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket"
        );

        assert!(websocket_url(&Url::parse("ftp://example.com").unwrap()).is_err());
    }

    #[test]
    fn test_namespace_from_url() {
        assert_eq!(namespace_from_url(&Url::parse("http://h:3000").unwrap()), "/");
        assert_eq!(
            namespace_from_url(&Url::parse("http://h/staff/").unwrap()),
            "/staff"
        );
    }
}
