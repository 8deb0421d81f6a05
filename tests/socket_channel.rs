use chatsphere::Error;
use chatsphere::api::events::{InboundMessage, OutboundMessage};
use chatsphere::api::socket::{ChannelSlot, MessageChannel, SocketChannel};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

const OPEN: &str = r#"0{"sid":"eio-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
const WAIT: Duration = Duration::from_secs(5);

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let frame = timeout(WAIT, ws.next()).await.expect("frame in time").expect("stream open").unwrap();
        if let Message::Text(text) = frame {
            return text;
        }
    }
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (tcp, _) = listener.accept().await.unwrap();
    accept_async(tcp).await.unwrap()
}

#[tokio::test]
async fn announces_user_answers_pings_and_relays_messages() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::Text(OPEN.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "40");
        ws.send(Message::Text(r#"40{"sid":"nsp-sid"}"#.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, r#"42["add-user","u1"]"#);

        ws.send(Message::Text("2".to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "3");

        ws.send(Message::Text(r#"42["msg-recieve","hello"]"#.to_string())).await.unwrap();
        let sent = next_text(&mut ws).await;
        assert_eq!(next_text(&mut ws).await, "41");
        sent
    });

    let (channel, mut inbound) = SocketChannel::connect(&format!("http://{addr}"), "u1").await.unwrap();
    assert_eq!(channel.sid(), "eio-sid");
    assert!(channel.is_connected());

    let msg = timeout(WAIT, inbound.recv()).await.unwrap().unwrap();
    assert_eq!(msg, InboundMessage::text("hello"));

    let out = OutboundMessage { to: "u2".into(), from: "u1".into(), msg: "hi back".into() };
    channel.emit_send(&out).unwrap();
    timeout(WAIT, channel.disconnect()).await.unwrap();

    let sent = server.await.unwrap();
    assert!(sent.starts_with("42"));
    let value: serde_json::Value = serde_json::from_str(&sent[2..]).unwrap();
    assert_eq!(value, serde_json::json!(["send-msg", {"to": "u2", "from": "u1", "msg": "hi back"}]));
}

#[tokio::test]
async fn refused_namespace_fails_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::Text(OPEN.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "40");
        ws.send(Message::Text(r#"44{"message":"Not authorized"}"#.to_string())).await.unwrap();
        // keep the socket open until the client gives up
        let _ = timeout(WAIT, ws.next()).await;
    });

    let res = SocketChannel::connect(&format!("http://{addr}"), "u1").await;
    assert!(matches!(res, Err(Error::Protocol(_))));
    server.await.unwrap();
}

#[tokio::test]
async fn inbound_receiver_ends_when_server_leaves() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::Text(OPEN.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "40");
        ws.send(Message::Text("40".to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, r#"42["add-user","u9"]"#);
        ws.send(Message::Text("41".to_string())).await.unwrap();
    });

    let (_channel, mut inbound) = SocketChannel::connect(&format!("http://{addr}"), "u9").await.unwrap();
    server.await.unwrap();
    assert_eq!(timeout(WAIT, inbound.recv()).await.unwrap(), None);
}

#[tokio::test]
async fn server_leaving_closes_the_channel_for_senders() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(Message::Text(OPEN.to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, "40");
        ws.send(Message::Text("40".to_string())).await.unwrap();
        assert_eq!(next_text(&mut ws).await, r#"42["add-user","u3"]"#);
        ws.send(Message::Text("41".to_string())).await.unwrap();
        // the tcp connection stays up; the client is expected to close it
        timeout(WAIT, ws.next()).await.expect("client closes in time")
    });

    let (channel, mut inbound) = SocketChannel::connect(&format!("http://{addr}"), "u3").await.unwrap();
    assert_eq!(timeout(WAIT, inbound.recv()).await.unwrap(), None);

    assert!(!channel.is_connected());
    let out = OutboundMessage { to: "u4".into(), from: "u3".into(), msg: "anyone?".into() };
    assert!(matches!(channel.emit_send(&out), Err(Error::ChannelClosed)));

    let last = server.await.unwrap();
    assert!(matches!(last, None | Some(Ok(Message::Close(_)))), "{last:?}");

    let slot = ChannelSlot::new();
    slot.set(channel);
    assert!(!slot.is_connected());
    assert!(matches!(slot.emit_send(&out), Err(Error::ChannelClosed)));
}

#[test]
fn empty_slot_reports_closed_channel() {
    let slot = ChannelSlot::new();
    assert!(!slot.is_connected());
    let out = OutboundMessage { to: "b".into(), from: "a".into(), msg: "x".into() };
    assert!(matches!(slot.emit_send(&out), Err(Error::ChannelClosed)));
    assert!(slot.take().is_none());
}
