use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::dtos::{CreateOfferRequest, SendMessageRequest};
use crate::domain::{Message, Offer, PaymentPrompt, RoomEvent};

use super::api::{ClientError, MessagingApi, OfferCommand};
use super::realtime::RealtimeLink;
use super::timeline::{merge_timeline, upsert_message, upsert_offer, PendingMessage, TimelineItem};
use super::typing::TypingIndicator;
use super::unread::UnreadBadge;

/// Local view of one open conversation.
///
/// Messages and offers arrive from two racing paths, REST fetches and room
/// events; both funnel through the same upserts so either order converges.
/// Only message sends are rendered optimistically. Offer actions wait for the
/// server and adopt whatever state it reports.
pub struct ConversationSession {
    api: Arc<dyn MessagingApi>,
    realtime: Arc<dyn RealtimeLink>,
    badge: Option<Arc<UnreadBadge>>,
    user_id: Uuid,
    conversation_id: Uuid,
    messages: Vec<Message>,
    offers: Vec<Offer>,
    pending: Vec<PendingMessage>,
    typing_users: HashSet<Uuid>,
    typing: TypingIndicator,
    payment_prompt: Option<PaymentPrompt>,
    pages_loaded: u32,
    history_exhausted: bool,
    is_open: bool,
    is_focused: bool,
}

impl ConversationSession {
    pub fn new(
        api: Arc<dyn MessagingApi>,
        realtime: Arc<dyn RealtimeLink>,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Self {
        Self {
            api,
            realtime,
            badge: None,
            user_id,
            conversation_id,
            messages: Vec::new(),
            offers: Vec::new(),
            pending: Vec::new(),
            typing_users: HashSet::new(),
            typing: TypingIndicator::default(),
            payment_prompt: None,
            pages_loaded: 0,
            history_exhausted: false,
            is_open: false,
            is_focused: true,
        }
    }

    pub fn with_badge(mut self, badge: Arc<UnreadBadge>) -> Self {
        self.badge = Some(badge);
        self
    }

    pub fn with_typing_indicator(mut self, typing: TypingIndicator) -> Self {
        self.typing = typing;
        self
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn pending(&self) -> &[PendingMessage] {
        &self.pending
    }

    pub fn history_exhausted(&self) -> bool {
        self.history_exhausted
    }

    pub fn payment_prompt(&self) -> Option<&PaymentPrompt> {
        self.payment_prompt.as_ref()
    }

    /// Other participants currently typing.
    pub fn typing_users(&self) -> impl Iterator<Item = &Uuid> {
        self.typing_users.iter()
    }

    pub fn timeline(&self) -> Vec<TimelineItem> {
        merge_timeline(&self.messages, &self.offers, &self.pending)
    }

    /// Joins the room, loads the newest page and the offers, then applies
    /// read-on-view.
    pub async fn open(&mut self) -> Result<(), ClientError> {
        self.realtime.join(self.conversation_id)?;
        self.is_open = true;
        self.resync().await?;
        debug!(
            conversation_id = %self.conversation_id,
            messages = self.messages.len(),
            offers = self.offers.len(),
            "conversation session opened"
        );
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        if let Some(is_typing) = self.typing.on_send() {
            self.send_typing(is_typing);
        }
        self.is_open = false;
        self.typing_users.clear();
        self.realtime.leave(self.conversation_id)
    }

    /// Re-fetches the newest page and the offer list. Room delivery has no
    /// replay, so this is how a session catches up after a reconnect.
    pub async fn resync(&mut self) -> Result<(), ClientError> {
        let latest = self.api.list_messages(self.conversation_id, 1).await?;
        let offers = self.api.list_offers(self.conversation_id).await?;

        for message in latest {
            self.absorb_message(message);
        }
        for offer in offers {
            upsert_offer(&mut self.offers, offer);
        }
        self.pages_loaded = self.pages_loaded.max(1);

        self.read_on_view().await;
        Ok(())
    }

    /// Loads the next older page. Returns how many messages it added.
    pub async fn load_older(&mut self) -> Result<usize, ClientError> {
        if self.history_exhausted {
            return Ok(0);
        }
        let page = self.pages_loaded + 1;
        let older = self.api.list_messages(self.conversation_id, page).await?;
        if older.is_empty() {
            self.history_exhausted = true;
            return Ok(0);
        }

        let before = self.messages.len();
        for message in older {
            self.absorb_message(message);
        }
        self.pages_loaded = page;
        Ok(self.messages.len() - before)
    }

    pub async fn set_focused(&mut self, focused: bool) {
        self.is_focused = focused;
        if focused {
            self.read_on_view().await;
        }
    }

    pub fn on_keystroke(&mut self, now: Instant) {
        if let Some(is_typing) = self.typing.on_keystroke(now) {
            self.send_typing(is_typing);
        }
    }

    /// Drives the idle timeout; call on a timer.
    pub fn poll_typing(&mut self, now: Instant) {
        if let Some(is_typing) = self.typing.poll(now) {
            self.send_typing(is_typing);
        }
    }

    /// Adds a pending entry and returns the request that confirms it.
    pub fn stage_text(&mut self, content: impl Into<String>) -> SendMessageRequest {
        let client_message_id = Uuid::now_v7();
        let content = content.into();
        self.pending.push(PendingMessage {
            client_message_id,
            sender_id: self.user_id,
            content: content.clone(),
            staged_at: Utc::now(),
        });
        SendMessageRequest {
            content: Some(content),
            file: None,
            client_message_id: Some(client_message_id),
        }
    }

    pub fn confirm_sent(&mut self, message: Message) {
        self.absorb_message(message);
    }

    /// Rolls back a pending entry after a failed send.
    pub fn fail_send(&mut self, client_message_id: Uuid) -> Option<PendingMessage> {
        let index = self
            .pending
            .iter()
            .position(|staged| staged.client_message_id == client_message_id)?;
        Some(self.pending.remove(index))
    }

    pub async fn send_text(&mut self, content: impl Into<String>) -> Result<Message, ClientError> {
        let request = self.stage_text(content);
        if let Some(is_typing) = self.typing.on_send() {
            self.send_typing(is_typing);
        }

        match self.api.send_message(self.conversation_id, &request).await {
            Ok(message) => {
                self.confirm_sent(message.clone());
                Ok(message)
            }
            Err(error) => {
                if let Some(client_message_id) = request.client_message_id {
                    self.fail_send(client_message_id);
                }
                warn!(
                    conversation_id = %self.conversation_id,
                    retryable = error.is_retryable(),
                    error = %error,
                    "message send failed; pending entry rolled back"
                );
                Err(error)
            }
        }
    }

    pub async fn create_offer(&mut self, request: &CreateOfferRequest) -> Result<Offer, ClientError> {
        let offer = self.api.create_offer(request).await?;
        upsert_offer(&mut self.offers, offer.clone());
        Ok(offer)
    }

    /// Sends an offer action and adopts the server's answer. On a state
    /// conflict the error carries the offer's current state, which replaces
    /// the stale local copy before the error is returned.
    pub async fn act_on_offer(
        &mut self,
        offer_id: Uuid,
        command: OfferCommand,
    ) -> Result<Offer, ClientError> {
        match self.api.offer_action(offer_id, &command).await {
            Ok(offer) => {
                upsert_offer(&mut self.offers, offer.clone());
                Ok(offer)
            }
            Err(error) => {
                if let Some(current) = error.current_offer() {
                    upsert_offer(&mut self.offers, current.clone());
                }
                Err(error)
            }
        }
    }

    /// Applies a room event. Events for other conversations are ignored.
    pub async fn handle_event(&mut self, event: RoomEvent) {
        if event.conversation_id() != self.conversation_id {
            return;
        }

        match event {
            RoomEvent::NewMessage(message) => {
                let foreign = message.sender_id != self.user_id;
                self.absorb_message(message);
                if foreign {
                    self.read_on_view().await;
                }
                self.refresh_badge().await;
            }
            RoomEvent::MessageRead { message_ids, .. } => {
                self.apply_read(&message_ids);
                self.refresh_badge().await;
            }
            RoomEvent::Typing {
                user_id, is_typing, ..
            } => {
                if user_id == self.user_id {
                    return;
                }
                if is_typing {
                    self.typing_users.insert(user_id);
                } else {
                    self.typing_users.remove(&user_id);
                }
            }
            RoomEvent::NewOffer(offer) | RoomEvent::OfferUpdated(offer) => {
                upsert_offer(&mut self.offers, offer);
            }
            RoomEvent::PaymentPrompt(prompt) => {
                if prompt.brand_id == self.user_id {
                    self.payment_prompt = Some(prompt);
                }
            }
        }
    }

    fn absorb_message(&mut self, message: Message) {
        if let Some(client_message_id) = message.client_message_id {
            self.pending
                .retain(|staged| staged.client_message_id != client_message_id);
        }
        if message.sender_id != self.user_id {
            self.typing_users.remove(&message.sender_id);
        }
        upsert_message(&mut self.messages, message);
    }

    fn apply_read(&mut self, message_ids: &[Uuid]) {
        let ids: HashSet<&Uuid> = message_ids.iter().collect();
        for message in self.messages.iter_mut().filter(|m| ids.contains(&m.id)) {
            message.is_read = true;
        }
    }

    fn has_unread_incoming(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.sender_id != self.user_id && !message.is_read)
    }

    async fn read_on_view(&mut self) {
        if !(self.is_open && self.is_focused) || !self.has_unread_incoming() {
            return;
        }
        match self.api.mark_read(self.conversation_id).await {
            Ok(response) => {
                self.apply_read(&response.message_ids);
                self.refresh_badge().await;
            }
            Err(error) => warn!(
                conversation_id = %self.conversation_id,
                error = %error,
                "read-on-view failed"
            ),
        }
    }

    async fn refresh_badge(&self) {
        if let Some(badge) = &self.badge {
            if let Err(error) = badge.refresh().await {
                warn!(error = %error, "unread badge refresh failed");
            }
        }
    }

    fn send_typing(&self, is_typing: bool) {
        if let Err(error) = self.realtime.typing(self.conversation_id, is_typing) {
            debug!(error = %error, "typing signal dropped");
        }
    }
}
