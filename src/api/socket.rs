use crate::api::events::{
    EVENT_ADD_USER, EVENT_MSG_RECEIVE, EVENT_SEND_MSG, Handshake, InboundMessage, OutboundMessage, Packet,
};
use crate::error::{Error, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::RwLock;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound half of the real-time channel as seen by the chat view-model.
pub trait MessageChannel: Send + Sync {
    /// Queues a `send-msg` event. Returns once queued, not once delivered.
    fn emit_send(&self, msg: &OutboundMessage) -> Result<()>;
}

/// One Socket.IO connection per login.
///
/// Inbound messages come out of the receiver returned by [`SocketChannel::connect`];
/// there is exactly one per connection, so a single consumer owns the
/// subscription for as long as the connection lives. The receiver yields `None`
/// once the connection is gone, and from then on every emit fails with
/// [`Error::ChannelClosed`]. There is no reconnect.
pub struct SocketChannel {
    sid: String,
    outgoing: mpsc::UnboundedSender<Packet>,
    closed: watch::Receiver<bool>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl SocketChannel {
    /// Connects to `{host}/socket.io/`, joins the default namespace and announces
    /// `user_id` with `add-user`.
    pub async fn connect(host: &str, user_id: &str) -> Result<(Self, mpsc::UnboundedReceiver<InboundMessage>)> {
        let url = crate::utils::socket_url(host).map_err(|e| Error::Protocol(e.to_string()))?;
        log::info!("connecting real-time channel to {url}");
        let (ws, _) = timeout(HANDSHAKE_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| Error::Protocol("websocket connect timed out".into()))??;
        let (mut sink, mut stream) = ws.split();

        let handshake = timeout(HANDSHAKE_TIMEOUT, Self::handshake(&mut sink, &mut stream))
            .await
            .map_err(|_| Error::Protocol("socket.io handshake timed out".into()))??;
        log::debug!("socket.io connected, sid {} ping every {}ms", handshake.sid, handshake.ping_interval);

        let (out_tx, out_rx) = mpsc::unbounded_channel::<Packet>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<InboundMessage>();
        let (closed_tx, closed_rx) = watch::channel(false);

        let writer = tokio::spawn(write_loop(sink, out_rx, closed_rx.clone()));
        let reader = tokio::spawn(read_loop(stream, out_tx.clone(), in_tx, closed_tx));

        let channel = Self {
            sid: handshake.sid,
            outgoing: out_tx,
            closed: closed_rx,
            writer: Some(writer),
            reader: Some(reader),
        };
        channel.emit(Packet::event(EVENT_ADD_USER, user_id)?)?;
        Ok((channel, in_rx))
    }

    async fn handshake(sink: &mut SplitSink<WsStream, Message>, stream: &mut SplitStream<WsStream>) -> Result<Handshake> {
        let open = loop {
            match next_packet(stream).await? {
                Packet::Open(hs) => break hs,
                Packet::Noop => continue,
                other => return Err(Error::Protocol(format!("expected engine.io open, got {other:?}"))),
            }
        };
        sink.send(Message::Text(Packet::Connect(None).encode())).await?;
        loop {
            match next_packet(stream).await? {
                Packet::Connect(_) => return Ok(open),
                Packet::ConnectError(reason) => return Err(Error::Protocol(format!("namespace refused: {reason}"))),
                Packet::Ping => sink.send(Message::Text(Packet::Pong.encode())).await?,
                Packet::Noop => {}
                other => log::debug!("ignoring {other:?} before namespace ack"),
            }
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// False once the server has left or the reader hit a transport error.
    pub fn is_connected(&self) -> bool {
        !*self.closed.borrow() && !self.outgoing.is_closed()
    }

    fn emit(&self, packet: Packet) -> Result<()> {
        if *self.closed.borrow() {
            return Err(Error::ChannelClosed);
        }
        self.outgoing.send(packet).map_err(|_| Error::ChannelClosed)
    }

    /// Leaves the namespace, closes the websocket and waits for the writer to finish.
    pub async fn disconnect(mut self) {
        let _ = self.outgoing.send(Packet::Disconnect);
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        log::info!("real-time channel {} closed", self.sid);
    }
}

impl MessageChannel for SocketChannel {
    fn emit_send(&self, msg: &OutboundMessage) -> Result<()> {
        self.emit(Packet::event(EVENT_SEND_MSG, msg)?)
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        for task in [self.writer.take(), self.reader.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

/// Holder the page shell owns: the view-model talks to the slot, the shell
/// decides when a connection goes in and when it comes out.
#[derive(Default)]
pub struct ChannelSlot {
    inner: RwLock<Option<SocketChannel>>,
}

impl ChannelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, channel: SocketChannel) {
        match self.inner.write() {
            Ok(mut slot) => *slot = Some(channel),
            Err(e) => log::error!("channel slot poisoned: {e}"),
        }
    }

    pub fn take(&self) -> Option<SocketChannel> {
        self.inner.write().ok().and_then(|mut slot| slot.take())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().map(|slot| slot.as_ref().is_some_and(SocketChannel::is_connected)).unwrap_or(false)
    }
}

impl MessageChannel for ChannelSlot {
    fn emit_send(&self, msg: &OutboundMessage) -> Result<()> {
        let slot = self.inner.read().map_err(|_| Error::ChannelClosed)?;
        slot.as_ref().ok_or(Error::ChannelClosed)?.emit_send(msg)
    }
}

async fn next_packet(stream: &mut SplitStream<WsStream>) -> Result<Packet> {
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => return Packet::decode(&text),
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(Error::ChannelClosed)
}

/// Stops after sending a `Disconnect`, or as soon as the reader reports the connection closed.
async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Packet>,
    mut closed: watch::Receiver<bool>,
) {
    loop {
        let packet = tokio::select! {
            packet = rx.recv() => match packet {
                Some(packet) => packet,
                None => break,
            },
            _ = closed.wait_for(|closed| *closed) => break,
        };
        let leaving = packet == Packet::Disconnect;
        if let Err(e) = sink.send(Message::Text(packet.encode())).await {
            log::warn!("real-time send failed: {e}");
            break;
        }
        if leaving {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    outgoing: mpsc::UnboundedSender<Packet>,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    closed: watch::Sender<bool>,
) {
    loop {
        let packet = match next_packet(&mut stream).await {
            Ok(packet) => packet,
            Err(Error::ChannelClosed) => break,
            Err(Error::Socket(e)) => {
                log::warn!("real-time channel dropped: {e}");
                break;
            }
            Err(e) => {
                log::warn!("skipping malformed packet: {e}");
                continue;
            }
        };
        match packet {
            Packet::Ping => {
                let _ = outgoing.send(Packet::Pong);
            }
            Packet::Event { name, args } if name == EVENT_MSG_RECEIVE => match InboundMessage::from_args(&args) {
                Some(msg) => {
                    if inbound.send(msg).is_err() {
                        log::debug!("inbound receiver dropped");
                    }
                }
                None => log::warn!("{EVENT_MSG_RECEIVE} without a text payload"),
            },
            Packet::Event { name, .. } => log::trace!("unhandled event {name}"),
            Packet::Disconnect | Packet::Close => {
                log::info!("server closed the real-time channel");
                break;
            }
            _ => {}
        }
    }
    let _ = closed.send(true);
}
