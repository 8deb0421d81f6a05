//! View-model behind the message pane of one open conversation.
//!
//! The list always reads: backend history as returned when the conversation
//! was opened, then every send and receive observed afterwards, in the order
//! this client saw them. Nothing is reconciled with the backend after the
//! initial load.

use crate::api::ChatBackend;
use crate::api::events::{InboundMessage, OutboundMessage};
use crate::api::models::{Contact, HistoryEntry, SendMessageRequest, User};
use crate::api::socket::MessageChannel;
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Own,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub origin: Origin,
    pub text: String,
    /// When this client observed the entry, not a server timestamp.
    pub observed_at: DateTime<Local>,
    pub delivery: Delivery,
    seq: Option<u64>,
}

impl ChatMessage {
    fn new(origin: Origin, text: String, delivery: Delivery) -> Self {
        Self { origin, text, observed_at: Local::now(), delivery, seq: None }
    }

    pub fn is_own(&self) -> bool {
        self.origin == Origin::Own
    }

    pub fn display_time(&self) -> String {
        self.observed_at.format("%-I:%M %p").to_string()
    }
}

impl From<HistoryEntry> for ChatMessage {
    fn from(entry: HistoryEntry) -> Self {
        let origin = if entry.from_self { Origin::Own } else { Origin::Remote };
        ChatMessage::new(origin, entry.message, Delivery::Delivered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Unopened,
    Loading,
    Ready,
}

/// Issued by [`ChatSession::begin_open`]; only the latest one is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTicket {
    generation: u64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    generation: u64,
    seq: u64,
}

/// The backend persistence call for a send. The entry is already in the list;
/// drive `persist` and report its outcome through [`ChatSession::confirm`].
pub struct PendingSend {
    pub ticket: SendTicket,
    pub persist: BoxFuture<'static, Result<()>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Appended,
    /// Sender is known and is not the open contact.
    Routed(String),
    /// No conversation is open.
    Dropped,
}

pub struct ChatSession {
    user: User,
    backend: Arc<dyn ChatBackend>,
    channel: Arc<dyn MessageChannel>,
    contact: Option<Contact>,
    state: ConversationState,
    generation: u64,
    next_seq: u64,
    messages: Vec<ChatMessage>,
    scroll_requested: bool,
}

impl ChatSession {
    pub fn new(user: User, backend: Arc<dyn ChatBackend>, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            user,
            backend,
            channel,
            contact: None,
            state: ConversationState::Unopened,
            generation: 0,
            next_seq: 0,
            messages: Vec::new(),
            scroll_requested: false,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True once after every change to the list, so the view can jump to the newest entry.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    /// Switches to `contact`: the old list is dropped and the state goes to `Loading`.
    pub fn begin_open(&mut self, contact: Contact) -> Result<OpenTicket> {
        if self.user.id.is_empty() || contact.id.is_empty() {
            return Err(Error::validation("conversation needs both participants"));
        }
        self.generation += 1;
        let ticket = OpenTicket { generation: self.generation, from: self.user.id.clone(), to: contact.id.clone() };
        log::debug!("opening conversation {} -> {}", ticket.from, ticket.to);
        self.contact = Some(contact);
        self.state = ConversationState::Loading;
        self.messages.clear();
        self.scroll_requested = true;
        Ok(ticket)
    }

    pub fn fetch_history(&self, ticket: &OpenTicket) -> BoxFuture<'static, Result<Vec<HistoryEntry>>> {
        let backend = Arc::clone(&self.backend);
        let (from, to) = (ticket.from.clone(), ticket.to.clone());
        async move { backend.history(&from, &to).await }.boxed()
    }

    /// False once a later `begin_open` has superseded `ticket`.
    pub fn is_current(&self, ticket: &OpenTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Installs the fetched history in front of anything observed while loading.
    /// Returns false for a ticket that a later open has superseded.
    pub fn finish_open(&mut self, ticket: &OpenTicket, history: Vec<HistoryEntry>) -> bool {
        if !self.is_current(ticket) {
            log::debug!("dropping stale history for {}", ticket.to);
            return false;
        }
        let observed = std::mem::take(&mut self.messages);
        self.messages = history.into_iter().map(ChatMessage::from).collect();
        self.messages.extend(observed);
        self.state = ConversationState::Ready;
        self.scroll_requested = true;
        true
    }

    /// Fetch errors propagate and leave the conversation in `Loading`.
    pub async fn open(&mut self, contact: Contact) -> Result<()> {
        let ticket = self.begin_open(contact)?;
        let history = self.fetch_history(&ticket).await?;
        self.finish_open(&ticket, history);
        Ok(())
    }

    /// Emits on the channel, creates the persistence call and appends the
    /// entry right away as `Pending`. Blank text is ignored.
    pub fn send(&mut self, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() {
            return None;
        }
        let Some(contact) = self.contact.as_ref() else {
            log::warn!("send without an open conversation");
            return None;
        };

        let outbound = OutboundMessage { to: contact.id.clone(), from: self.user.id.clone(), msg: text.to_string() };
        if let Err(e) = self.channel.emit_send(&outbound) {
            log::warn!("real-time emit failed: {e}");
        }

        let backend = Arc::clone(&self.backend);
        let req = SendMessageRequest { from: outbound.from, to: outbound.to, message: outbound.msg };
        let persist = async move { backend.send_message(&req).await }.boxed();

        let seq = self.next_seq;
        self.next_seq += 1;
        let mut entry = ChatMessage::new(Origin::Own, text.to_string(), Delivery::Pending);
        entry.seq = Some(seq);
        self.messages.push(entry);
        self.scroll_requested = true;

        Some(PendingSend { ticket: SendTicket { generation: self.generation, seq }, persist })
    }

    /// Marks a pending entry delivered or failed. The entry itself stays.
    pub fn confirm(&mut self, ticket: SendTicket, outcome: &Result<()>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let Some(entry) = self.messages.iter_mut().find(|m| m.seq == Some(ticket.seq)) else {
            return false;
        };
        entry.delivery = match outcome {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                log::warn!("message was not persisted: {e}");
                Delivery::Failed
            }
        };
        true
    }

    pub fn on_inbound(&mut self, msg: InboundMessage) -> InboundOutcome {
        let Some(contact) = self.contact.as_ref() else {
            return InboundOutcome::Dropped;
        };
        if let Some(from) = msg.from {
            if from != contact.id {
                return InboundOutcome::Routed(from);
            }
        }
        self.messages.push(ChatMessage::new(Origin::Remote, msg.text, Delivery::Delivered));
        self.scroll_requested = true;
        InboundOutcome::Appended
    }
}

/// Inserts `snippet` into `draft` at character offset `cursor` (clamped to the
/// end) and returns the new draft with the cursor placed after the insertion.
pub fn insert_at_cursor(draft: &str, cursor: usize, snippet: &str) -> (String, usize) {
    let byte = draft.char_indices().nth(cursor).map_or(draft.len(), |(i, _)| i);
    let mut out = String::with_capacity(draft.len() + snippet.len());
    out.push_str(&draft[..byte]);
    out.push_str(snippet);
    out.push_str(&draft[byte..]);
    let cursor = draft[..byte].chars().count() + snippet.chars().count();
    (out, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_goes_in_at_the_cursor() {
        assert_eq!(insert_at_cursor("", 0, "😀"), ("😀".to_string(), 1));
        assert_eq!(insert_at_cursor("hi there", 2, "👋"), ("hi👋 there".to_string(), 3));
        assert_eq!(insert_at_cursor("é!", 1, "🙂"), ("é🙂!".to_string(), 2));
        assert_eq!(insert_at_cursor("end", 99, "🎉"), ("end🎉".to_string(), 4));
    }

    #[test]
    fn history_entries_keep_their_origin() {
        let own: ChatMessage = HistoryEntry { from_self: true, message: "a".into() }.into();
        let remote: ChatMessage = HistoryEntry { from_self: false, message: "b".into() }.into();
        assert!(own.is_own());
        assert_eq!(remote.origin, Origin::Remote);
        assert_eq!(remote.delivery, Delivery::Delivered);
    }

    #[test]
    fn display_time_is_twelve_hour_clock() {
        let msg = ChatMessage::new(Origin::Remote, "x".into(), Delivery::Delivered);
        let shown = msg.display_time();
        assert!(shown.ends_with("AM") || shown.ends_with("PM"), "{shown}");
    }
}
