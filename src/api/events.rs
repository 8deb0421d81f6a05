//! Socket.IO v4 packets as they travel over the Engine.IO v4 websocket transport.
//!
//! Only the default namespace is spoken. Acks and binary attachments are never
//! requested by this client and decode to [`Packet::Other`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_ADD_USER: &str = "add-user";
pub const EVENT_SEND_MSG: &str = "send-msg";
/// Spelled the way the backend emits it.
pub const EVENT_MSG_RECEIVE: &str = "msg-recieve";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO `0`
    Open(Handshake),
    /// Engine.IO `1`
    Close,
    /// Engine.IO `2`
    Ping,
    /// Engine.IO `3`
    Pong,
    /// Engine.IO `6`
    Noop,
    /// Socket.IO `0`
    Connect(Option<Value>),
    /// Socket.IO `1`
    Disconnect,
    /// Socket.IO `2`
    Event { name: String, args: Vec<Value> },
    /// Socket.IO `4`
    ConnectError(Value),
    Other(String),
}

impl Packet {
    pub fn event(name: &str, payload: impl Serialize) -> Result<Self> {
        Ok(Packet::Event { name: name.to_string(), args: vec![serde_json::to_value(payload)?] })
    }

    pub fn encode(&self) -> String {
        match self {
            Packet::Open(hs) => format!("0{}", serde_json::to_string(hs).unwrap_or_default()),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Noop => "6".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(data)) => format!("40{data}"),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { name, args } => {
                let mut arr = Vec::with_capacity(args.len() + 1);
                arr.push(Value::String(name.clone()));
                arr.extend(args.iter().cloned());
                format!("42{}", Value::Array(arr))
            }
            Packet::ConnectError(data) => format!("44{data}"),
            Packet::Other(raw) => raw.clone(),
        }
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or_else(|| Error::Protocol("empty packet".into()))?;
        let rest = chars.as_str();
        match kind {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => decode_socket(rest, text),
            '5' => Ok(Packet::Other(text.to_string())),
            '6' => Ok(Packet::Noop),
            other => Err(Error::Protocol(format!("unknown engine packet type {other:?}"))),
        }
    }
}

fn decode_socket(body: &str, raw: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or_else(|| Error::Protocol("empty socket packet".into()))?;
    let mut rest = chars.as_str();

    if rest.starts_with('/') {
        let (nsp, tail) = rest.split_once(',').unwrap_or((rest, ""));
        if nsp != "/" {
            log::trace!("ignoring packet for namespace {nsp}");
            return Ok(Packet::Other(raw.to_string()));
        }
        rest = tail;
    }
    let ack_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let (ack, data) = rest.split_at(ack_len);

    match kind {
        '0' if data.is_empty() => Ok(Packet::Connect(None)),
        '0' => Ok(Packet::Connect(Some(serde_json::from_str(data)?))),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let mut arr = match serde_json::from_str::<Value>(data)? {
                Value::Array(arr) => arr,
                _ => return Err(Error::Protocol("event payload is not an array".into())),
            };
            if arr.is_empty() {
                return Err(Error::Protocol("event without a name".into()));
            }
            let name = match arr.remove(0) {
                Value::String(name) => name,
                _ => return Err(Error::Protocol("event name is not a string".into())),
            };
            if !ack.is_empty() {
                log::debug!("event {name} requested ack {ack}, not supported");
            }
            Ok(Packet::Event { name, args: arr })
        }
        '4' => Ok(Packet::ConnectError(serde_json::from_str(data).unwrap_or(Value::String(data.to_string())))),
        _ => Ok(Packet::Other(raw.to_string())),
    }
}

/// Payload of an outgoing `send-msg` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub msg: String,
}

/// A message pushed to this client. The backend sends only the text; `from`
/// is filled when a richer `{from, msg}` payload arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: Option<String>,
    pub text: String,
}

impl InboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self { from: None, text: text.into() }
    }

    pub fn from_args(args: &[Value]) -> Option<Self> {
        match args.first()? {
            Value::String(text) => Some(Self::text(text.clone())),
            Value::Object(obj) => {
                let text = obj.get("msg").or_else(|| obj.get("message")).and_then(|v| v.as_str())?;
                let from = obj.get("from").and_then(|v| v.as_str()).map(str::to_string);
                Some(Self { from, text: text.to_string() })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_engine_open() {
        let pkt = Packet::decode(r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#).unwrap();
        match pkt {
            Packet::Open(hs) => {
                assert_eq!(hs.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(hs.ping_interval, 25000);
                assert_eq!(hs.max_payload, Some(1_000_000));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_connect_ack_and_error() {
        assert_eq!(Packet::decode(r#"40{"sid":"abc"}"#).unwrap(), Packet::Connect(Some(json!({"sid": "abc"}))));
        assert_eq!(Packet::decode("40").unwrap(), Packet::Connect(None));
        assert_eq!(
            Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError(json!({"message": "Not authorized"}))
        );
    }

    #[test]
    fn decodes_inbound_message_event() {
        let pkt = Packet::decode(r#"42["msg-recieve","hello there"]"#).unwrap();
        let Packet::Event { name, args } = pkt else { panic!("not an event") };
        assert_eq!(name, EVENT_MSG_RECEIVE);
        assert_eq!(InboundMessage::from_args(&args), Some(InboundMessage::text("hello there")));
    }

    #[test]
    fn event_with_ack_id_and_default_namespace() {
        let pkt = Packet::decode(r#"42/,12["msg-recieve","x"]"#).unwrap();
        assert_eq!(pkt, Packet::Event { name: "msg-recieve".into(), args: vec![json!("x")] });
    }

    #[test]
    fn foreign_namespace_is_ignored() {
        let pkt = Packet::decode(r#"42/admin,["msg-recieve","x"]"#).unwrap();
        assert!(matches!(pkt, Packet::Other(_)));
    }

    #[test]
    fn encodes_send_msg_event() {
        let out = OutboundMessage { to: "b".into(), from: "a".into(), msg: "hi".into() };
        let encoded = Packet::event(EVENT_SEND_MSG, &out).unwrap().encode();
        assert!(encoded.starts_with("42["));
        let arr: Value = serde_json::from_str(&encoded[2..]).unwrap();
        assert_eq!(arr, json!(["send-msg", {"to": "b", "from": "a", "msg": "hi"}]));
        assert_eq!(Packet::event(EVENT_ADD_USER, "u1").unwrap().encode(), r#"42["add-user","u1"]"#);
    }

    #[test]
    fn control_packets() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::Pong.encode(), "3");
        assert_eq!(Packet::Connect(None).encode(), "40");
        assert_eq!(Packet::Disconnect.encode(), "41");
        assert!(Packet::decode("").is_err());
        assert!(Packet::decode("9").is_err());
        assert!(Packet::decode(r#"42{"not":"array"}"#).is_err());
    }

    #[test]
    fn inbound_object_payload_carries_sender() {
        let msg = InboundMessage::from_args(&[json!({"from": "u7", "msg": "yo"})]).unwrap();
        assert_eq!(msg.from.as_deref(), Some("u7"));
        assert_eq!(msg.text, "yo");
        assert_eq!(InboundMessage::from_args(&[json!(42)]), None);
        assert_eq!(InboundMessage::from_args(&[]), None);
    }
}
