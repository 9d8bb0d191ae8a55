use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Message, Offer};

/// A locally staged send awaiting server confirmation. Never authoritative
/// for ordering or read state.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub client_message_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub staged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineItem {
    Message(Message),
    Offer(Offer),
    Pending(PendingMessage),
}

impl TimelineItem {
    pub fn id(&self) -> Uuid {
        match self {
            TimelineItem::Message(message) => message.id,
            TimelineItem::Offer(offer) => offer.id,
            TimelineItem::Pending(pending) => pending.client_message_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineItem::Message(message) => message.sent_at,
            TimelineItem::Offer(offer) => offer.created_at,
            TimelineItem::Pending(pending) => pending.staged_at,
        }
    }

    pub const fn is_pending(&self) -> bool {
        matches!(self, TimelineItem::Pending(_))
    }
}

/// Merges confirmed messages and offers by timestamp, ties broken by id, with
/// duplicates dropped. Pending sends trail the confirmed items in the order
/// they were staged.
pub fn merge_timeline(
    messages: &[Message],
    offers: &[Offer],
    pending: &[PendingMessage],
) -> Vec<TimelineItem> {
    let mut seen = HashSet::with_capacity(messages.len() + offers.len());
    let mut confirmed: Vec<TimelineItem> = messages
        .iter()
        .cloned()
        .map(TimelineItem::Message)
        .chain(offers.iter().cloned().map(TimelineItem::Offer))
        .filter(|item| seen.insert(item.id()))
        .collect();
    confirmed.sort_by_key(|item| (item.timestamp(), item.id()));

    let confirmed_client_ids: HashSet<Uuid> = messages
        .iter()
        .filter_map(|message| message.client_message_id)
        .collect();
    confirmed.extend(
        pending
            .iter()
            .filter(|staged| !confirmed_client_ids.contains(&staged.client_message_id))
            .cloned()
            .map(TimelineItem::Pending),
    );
    confirmed
}

/// Inserts or replaces by id, keeping `(sent_at, id)` order.
pub fn upsert_message(messages: &mut Vec<Message>, message: Message) {
    if let Some(existing) = messages.iter_mut().find(|m| m.id == message.id) {
        // A fetched copy may carry a newer read flag than a replayed event.
        let is_read = existing.is_read || message.is_read;
        *existing = message;
        existing.is_read = is_read;
        return;
    }
    let key = (message.sent_at, message.id);
    let position = messages.partition_point(|m| (m.sent_at, m.id) <= key);
    messages.insert(position, message);
}

/// Inserts or replaces by id; an older snapshot never overwrites a newer one.
pub fn upsert_offer(offers: &mut Vec<Offer>, offer: Offer) {
    if let Some(existing) = offers.iter_mut().find(|o| o.id == offer.id) {
        if offer.updated_at >= existing.updated_at {
            *existing = offer;
        }
        return;
    }
    let key = (offer.created_at, offer.id);
    let position = offers.partition_point(|o| (o.created_at, o.id) <= key);
    offers.insert(position, offer);
}
