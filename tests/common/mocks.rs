use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use negotiation_backend::application::RoomPublisher;
use negotiation_backend::domain::{
    next_sent_at, Conversation, CounterTerms, Message, Offer, OfferStatus, RoomEvent,
};
use negotiation_backend::error::{AppError, AppResult};
use negotiation_backend::infrastructure::notifications::{NotificationDispatcher, NotificationJob};
use negotiation_backend::infrastructure::payment::{PaymentGateway, PaymentRequest};
use negotiation_backend::infrastructure::repositories::{
    AppendOutcome, MessageRepository, OfferRepository,
};
use uuid::Uuid;

/// In-memory conversations and messages. Every operation runs under one lock,
/// which gives the same all-or-nothing behavior as the SQL transactions.
#[derive(Default)]
pub struct MockMessageRepo {
    pub conversations: Mutex<Vec<Conversation>>,
    pub messages: Mutex<Vec<Message>>,
}

impl MockMessageRepo {
    pub fn conversation(&self, id: Uuid) -> Option<Conversation> {
        self.conversations
            .lock()
            .expect("conversations mutex poisoned")
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn stored_messages(&self, conversation_id: Uuid) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .expect("messages mutex poisoned")
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.sent_at, m.id));
        messages
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepo {
    async fn upsert_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation> {
        let mut conversations = self.conversations.lock().expect("conversations mutex poisoned");
        if let Some(existing) = conversations
            .iter()
            .find(|c| c.participant_a == participant_a && c.participant_b == participant_b)
        {
            return Ok(existing.clone());
        }
        let conversation = Conversation::new(participant_a, participant_b, Utc::now())?;
        conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.conversation(id))
    }

    async fn find_user_conversations(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        Ok(self
            .conversations
            .lock()
            .expect("conversations mutex poisoned")
            .iter()
            .filter(|c| c.includes(user_id))
            .cloned()
            .collect())
    }

    async fn append_message(&self, message: &Message) -> AppResult<AppendOutcome> {
        let mut conversations = self.conversations.lock().expect("conversations mutex poisoned");
        let mut messages = self.messages.lock().expect("messages mutex poisoned");

        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
            .ok_or_else(|| AppError::NotFound("conversation not found".to_string()))?;

        if let Some(client_message_id) = message.client_message_id {
            if let Some(existing) = messages.iter().find(|m| {
                m.conversation_id == message.conversation_id
                    && m.sender_id == message.sender_id
                    && m.client_message_id == Some(client_message_id)
            }) {
                return Ok(AppendOutcome::Duplicate(existing.clone()));
            }
        }

        let mut created = message.clone();
        created.sent_at = next_sent_at(conversation.last_message_at, created.sent_at);
        created.is_read = false;

        conversation.last_message_id = Some(created.id);
        conversation.last_message_sender_id = Some(created.sender_id);
        conversation.last_message_preview = Some(created.preview());
        conversation.last_message_at = Some(created.sent_at);
        if conversation.participant_a != created.sender_id {
            conversation.unread_a += 1;
        }
        if conversation.participant_b != created.sender_id {
            conversation.unread_b += 1;
        }
        conversation.updated_at = Utc::now();

        messages.push(created.clone());
        Ok(AppendOutcome::Created(created))
    }

    async fn find_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let mut newest_first = self.stored_messages(conversation_id);
        newest_first.reverse();
        let mut page: Vec<Message> = newest_first
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conversations = self.conversations.lock().expect("conversations mutex poisoned");
        let mut messages = self.messages.lock().expect("messages mutex poisoned");

        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| AppError::NotFound("conversation not found".to_string()))?;

        let mut flipped: Vec<&mut Message> = messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id && m.sender_id != reader_id && !m.is_read)
            .collect();
        flipped.sort_by_key(|m| (m.sent_at, m.id));
        let ids: Vec<Uuid> = flipped
            .into_iter()
            .map(|m| {
                m.is_read = true;
                m.id
            })
            .collect();

        let count = i32::try_from(ids.len()).unwrap_or(i32::MAX);
        if conversation.participant_a == reader_id {
            conversation.unread_a = (conversation.unread_a - count).max(0);
        } else if conversation.participant_b == reader_id {
            conversation.unread_b = (conversation.unread_b - count).max(0);
        }
        Ok(ids)
    }
}

/// In-memory offers with compare-and-swap transitions.
#[derive(Default)]
pub struct MockOfferRepo {
    pub offers: Mutex<Vec<Offer>>,
}

impl MockOfferRepo {
    pub fn stored(&self, id: Uuid) -> Option<Offer> {
        self.offers
            .lock()
            .expect("offers mutex poisoned")
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    pub fn insert(&self, offer: Offer) {
        self.offers.lock().expect("offers mutex poisoned").push(offer);
    }

    /// Rewrites a stored offer, simulating another writer or elapsed time.
    pub fn update(&self, id: Uuid, change: impl FnOnce(&mut Offer)) {
        let mut offers = self.offers.lock().expect("offers mutex poisoned");
        if let Some(offer) = offers.iter_mut().find(|o| o.id == id) {
            change(offer);
        }
    }
}

#[async_trait]
impl OfferRepository for MockOfferRepo {
    async fn create(&self, offer: &Offer) -> AppResult<Offer> {
        self.insert(offer.clone());
        Ok(offer.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Offer>> {
        Ok(self.stored(id))
    }

    async fn find_by_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<Offer>> {
        let mut offers: Vec<Offer> = self
            .offers
            .lock()
            .expect("offers mutex poisoned")
            .iter()
            .filter(|o| o.conversation_id == conversation_id)
            .cloned()
            .collect();
        offers.sort_by_key(|o| (o.created_at, o.id));
        Ok(offers)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OfferStatus,
        next: OfferStatus,
        counter: Option<&CounterTerms>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Offer>> {
        let mut offers = self.offers.lock().expect("offers mutex poisoned");
        let Some(offer) = offers
            .iter_mut()
            .find(|o| o.id == id && o.status == expected && o.valid_until >= now)
        else {
            return Ok(None);
        };

        offer.status = next;
        if let Some(counter) = counter {
            offer.counter_offer = Some(counter.clone());
        }
        offer.updated_at = now;
        Ok(Some(offer.clone()))
    }

    async fn spawn_follow_up(
        &self,
        original_id: Uuid,
        follow_up: &Offer,
    ) -> AppResult<Option<Offer>> {
        let mut offers = self.offers.lock().expect("offers mutex poisoned");
        let Some(original) = offers.iter_mut().find(|o| {
            o.id == original_id
                && o.status == OfferStatus::Countered
                && o.follow_up_offer_id.is_none()
        }) else {
            return Ok(None);
        };

        original.follow_up_offer_id = Some(follow_up.id);
        original.updated_at = follow_up.created_at;
        offers.push(follow_up.clone());
        Ok(Some(follow_up.clone()))
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Offer>> {
        let mut lapsed: Vec<Offer> = self
            .offers
            .lock()
            .expect("offers mutex poisoned")
            .iter()
            .filter(|o| o.status == OfferStatus::Pending && o.valid_until < now)
            .cloned()
            .collect();
        lapsed.sort_by_key(|o| o.valid_until);
        lapsed.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(lapsed)
    }

    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Offer>> {
        let mut offers = self.offers.lock().expect("offers mutex poisoned");
        let Some(offer) = offers
            .iter_mut()
            .find(|o| o.id == id && o.status == OfferStatus::Pending && o.valid_until < now)
        else {
            return Ok(None);
        };
        offer.status = OfferStatus::Expired;
        offer.updated_at = now;
        Ok(Some(offer.clone()))
    }
}

/// Captures every published room event.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<RoomEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<RoomEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .iter()
            .map(RoomEvent::name)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().expect("events mutex poisoned").clear();
    }
}

impl RoomPublisher for RecordingPublisher {
    fn publish(&self, event: &RoomEvent) -> usize {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(event.clone());
        1
    }
}

/// Payment collaborator double: records requests, optionally fails.
#[derive(Default)]
pub struct MockPaymentGateway {
    pub requests: Mutex<Vec<PaymentRequest>>,
    pub fail: Mutex<bool>,
}

impl MockPaymentGateway {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: Mutex::new(true),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().expect("fail mutex poisoned") = fail;
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initiate_payment(&self, request: &PaymentRequest) -> AppResult<String> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request.clone());
        if *self.fail.lock().expect("fail mutex poisoned") {
            return Err(AppError::upstream("payment", "checkout service unavailable"));
        }
        Ok(format!("chk_{}", request.offer_id.simple()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub jobs: Mutex<Vec<NotificationJob>>,
}

impl RecordingNotifier {
    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().expect("jobs mutex poisoned").clone()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn dispatch(&self, job: NotificationJob) {
        self.jobs.lock().expect("jobs mutex poisoned").push(job);
    }
}
