use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::api::dtos::{CheckoutResponse, CounterOfferRequest, CreateOfferRequest};
use crate::application::{ConversationService, RoomPublisher};
use crate::domain::{
    Actor, CounterTerms, DomainError, Offer, OfferAction, OfferStatus, OfferType, PaymentPrompt,
    RoomEvent,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::notifications::{NotificationDispatcher, NotificationJob};
use crate::infrastructure::payment::{PaymentGateway, PaymentRequest};
use crate::infrastructure::repositories::{MessageRepository, OfferRepository};

const EXPIRY_BATCH_SIZE: i64 = 100;

#[derive(Clone)]
pub struct OfferService {
    offer_repo: Arc<dyn OfferRepository>,
    conversations: ConversationService,
    publisher: Arc<dyn RoomPublisher>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationDispatcher>,
    counter_validity: Duration,
}

impl OfferService {
    pub fn new(
        offer_repo: Arc<dyn OfferRepository>,
        message_repo: Arc<dyn MessageRepository>,
        publisher: Arc<dyn RoomPublisher>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationDispatcher>,
        counter_validity: Duration,
    ) -> Self {
        Self {
            offer_repo,
            conversations: ConversationService::new(message_repo),
            publisher,
            payments,
            notifier,
            counter_validity,
        }
    }

    pub async fn create_offer(&self, actor: Actor, request: CreateOfferRequest) -> AppResult<Offer> {
        request.validate()?;

        if let Some(requested) = request.offer_type {
            if requested != OfferType::for_sender(actor.role) {
                return Err(DomainError::invalid_offer_field(
                    "type",
                    format!("a {} cannot send this type of offer", actor.role),
                )
                .into());
            }
        }

        let conversation = self
            .conversations
            .authorize(actor.user_id, request.conversation_id)
            .await?;
        if conversation.other_participant(actor.user_id) != Some(request.recipient_id) {
            return Err(DomainError::invalid_offer_field(
                "recipient_id",
                "recipient must be the other participant of the conversation",
            )
            .into());
        }

        let recipient_id = request.recipient_id;
        let offer = Offer::create(
            conversation.id,
            actor.user_id,
            actor.role,
            recipient_id,
            request.into_draft(),
            Utc::now(),
        )?;
        let offer = self.offer_repo.create(&offer).await?;

        info!(
            offer_id = %offer.id,
            conversation_id = %offer.conversation_id,
            offer_type = ?offer.offer_type,
            "offer created"
        );
        self.publisher.publish(&RoomEvent::NewOffer(offer.clone()));
        self.notify_counterparty(&offer, recipient_id);

        Ok(offer)
    }

    pub async fn get_offer(&self, user_id: Uuid, offer_id: Uuid) -> AppResult<Offer> {
        let offer = self.load(offer_id).await?;
        if !offer.involves(user_id) {
            warn!(user_id = %user_id, offer_id = %offer_id, "offer access denied: not a party");
            return Err(AppError::Forbidden(
                "You are not a party to this offer".to_string(),
            ));
        }
        Ok(offer.with_effective_status(Utc::now()))
    }

    pub async fn list_offers(&self, user_id: Uuid, conversation_id: Uuid) -> AppResult<Vec<Offer>> {
        self.conversations.authorize(user_id, conversation_id).await?;

        let now = Utc::now();
        Ok(self
            .offer_repo
            .find_by_conversation(conversation_id)
            .await?
            .into_iter()
            .map(|offer| offer.with_effective_status(now))
            .collect())
    }

    pub async fn accept_offer(&self, actor_id: Uuid, offer_id: Uuid) -> AppResult<Offer> {
        let offer = self
            .transition(actor_id, offer_id, OfferAction::Accept)
            .await?;

        if offer.offer_type == OfferType::BrandToCreator {
            let checkout_reference = match self.initiate_payment(&offer).await {
                Ok(reference) => Some(reference),
                Err(error) => {
                    warn!(
                        offer_id = %offer.id,
                        error = %error,
                        "payment initiation failed; prompting without checkout reference"
                    );
                    None
                }
            };
            self.publish_payment_prompt(&offer, checkout_reference);
        }

        Ok(offer)
    }

    pub async fn reject_offer(&self, actor_id: Uuid, offer_id: Uuid) -> AppResult<Offer> {
        self.transition(actor_id, offer_id, OfferAction::Reject)
            .await
    }

    pub async fn counter_offer(
        &self,
        actor_id: Uuid,
        offer_id: Uuid,
        request: CounterOfferRequest,
    ) -> AppResult<Offer> {
        request.validate()?;
        let now = Utc::now();
        let offer = self.load(offer_id).await?;
        let terms = request.resolve_against(&offer);
        terms.validate()?;

        self.apply(offer, actor_id, OfferAction::Counter, Some(terms), now)
            .await
    }

    /// The original sender accepts the counter terms. The countered offer stays
    /// `countered`; a fresh pending offer with flipped roles is returned.
    pub async fn accept_counter(&self, actor_id: Uuid, offer_id: Uuid) -> AppResult<Offer> {
        let now = Utc::now();
        let original = self.load(offer_id).await?;
        self.check(&original, OfferAction::AcceptCounter, actor_id, now)?;

        let follow_up = original.follow_up(now, self.counter_validity)?;
        let Some(created) = self.offer_repo.spawn_follow_up(original.id, &follow_up).await? else {
            return Err(self
                .lost_race(offer_id, OfferAction::AcceptCounter, actor_id)
                .await);
        };

        info!(
            offer_id = %original.id,
            follow_up_offer_id = %created.id,
            price = %created.price,
            "counter offer accepted"
        );

        let mut linked = original;
        linked.follow_up_offer_id = Some(created.id);
        linked.updated_at = created.created_at;
        self.publisher.publish(&RoomEvent::OfferUpdated(linked));
        self.publisher.publish(&RoomEvent::NewOffer(created.clone()));
        self.notify_counterparty(&created, created.recipient_id);

        Ok(created)
    }

    /// Re-runs the payment handoff for an accepted offer on behalf of its brand.
    pub async fn initiate_checkout(&self, actor_id: Uuid, offer_id: Uuid) -> AppResult<CheckoutResponse> {
        let offer = self.load(offer_id).await?;
        if offer.brand_id() != actor_id {
            warn!(user_id = %actor_id, offer_id = %offer_id, "checkout denied: not the brand");
            return Err(AppError::Forbidden(
                "Only the brand on this offer can start checkout".to_string(),
            ));
        }
        if offer.status != OfferStatus::Accepted {
            return Err(DomainError::InvalidTransition(Box::new(
                offer.with_effective_status(Utc::now()),
            ))
            .into());
        }

        let checkout_reference = self.initiate_payment(&offer).await?;
        self.publish_payment_prompt(&offer, Some(checkout_reference.clone()));

        Ok(CheckoutResponse {
            offer_id: offer.id,
            checkout_reference,
            amount: offer.price,
            currency: offer.currency,
        })
    }

    /// Persists `expired` for lapsed pending offers; returns how many moved.
    pub async fn expire_stale_offers(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut expired = 0;
        loop {
            let batch = self
                .offer_repo
                .find_expired_pending(now, EXPIRY_BATCH_SIZE)
                .await?;
            let batch_len = batch.len();

            let mut moved_in_batch = 0;
            for candidate in batch {
                if let Some(offer) = self.offer_repo.mark_expired(candidate.id, now).await? {
                    debug!(offer_id = %offer.id, "offer expired");
                    self.publisher.publish(&RoomEvent::OfferUpdated(offer.clone()));
                    self.notify_counterparty(&offer, offer.sender_id);
                    moved_in_batch += 1;
                }
            }
            expired += moved_in_batch;

            // A short batch or one where nothing moved means the backlog is drained.
            if batch_len < EXPIRY_BATCH_SIZE as usize || moved_in_batch == 0 {
                break;
            }
        }

        if expired > 0 {
            info!(count = expired, "expired stale offers");
        }
        Ok(expired)
    }

    async fn transition(
        &self,
        actor_id: Uuid,
        offer_id: Uuid,
        action: OfferAction,
    ) -> AppResult<Offer> {
        let offer = self.load(offer_id).await?;
        self.apply(offer, actor_id, action, None, Utc::now()).await
    }

    async fn apply(
        &self,
        offer: Offer,
        actor_id: Uuid,
        action: OfferAction,
        counter: Option<CounterTerms>,
        now: DateTime<Utc>,
    ) -> AppResult<Offer> {
        let offer_id = offer.id;
        let expected = self.check(&offer, action, actor_id, now)?;
        let next = action.resulting_status();

        let Some(updated) = self
            .offer_repo
            .transition_status(offer_id, expected, next, counter.as_ref(), now)
            .await?
        else {
            return Err(self.lost_race(offer_id, action, actor_id).await);
        };

        info!(
            offer_id = %updated.id,
            action = action.as_str(),
            from = expected.as_str(),
            to = updated.status.as_str(),
            "offer transitioned"
        );
        self.publisher.publish(&RoomEvent::OfferUpdated(updated.clone()));
        let counterparty = if actor_id == updated.sender_id {
            updated.recipient_id
        } else {
            updated.sender_id
        };
        self.notify_counterparty(&updated, counterparty);

        Ok(updated)
    }

    fn check(
        &self,
        offer: &Offer,
        action: OfferAction,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<OfferStatus> {
        offer.check_transition(action, actor_id, now).map_err(|error| {
            if matches!(error, DomainError::NotRecipient | DomainError::NotSender) {
                warn!(
                    user_id = %actor_id,
                    offer_id = %offer.id,
                    action = action.as_str(),
                    "offer action denied: {error}"
                );
            }
            error.into()
        })
    }

    /// The conditional write matched nothing: another writer moved the offer
    /// first. Re-reads it so the caller gets the authoritative state.
    async fn lost_race(&self, offer_id: Uuid, action: OfferAction, actor_id: Uuid) -> AppError {
        let current = match self.load(offer_id).await {
            Ok(current) => current,
            Err(error) => return error,
        };
        debug!(offer_id = %offer_id, action = action.as_str(), "offer changed concurrently");

        match current.check_transition(action, actor_id, Utc::now()) {
            Err(error) => error.into(),
            Ok(_) => DomainError::InvalidTransition(Box::new(current)).into(),
        }
    }

    async fn load(&self, offer_id: Uuid) -> AppResult<Offer> {
        self.offer_repo
            .find_by_id(offer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("offer not found".to_string()))
    }

    async fn initiate_payment(&self, offer: &Offer) -> AppResult<String> {
        let request = PaymentRequest {
            offer_id: offer.id,
            payer_id: offer.brand_id(),
            amount: offer.price,
            currency: offer.currency.clone(),
        };
        self.payments.initiate_payment(&request).await
    }

    fn publish_payment_prompt(&self, offer: &Offer, checkout_reference: Option<String>) {
        let prompt = PaymentPrompt {
            offer_id: offer.id,
            conversation_id: offer.conversation_id,
            brand_id: offer.brand_id(),
            amount: offer.price,
            currency: offer.currency.clone(),
            checkout_reference,
            call_to_action: format!(
                "Offer accepted: complete payment of {} {} to start the collaboration",
                offer.price, offer.currency
            ),
        };
        self.publisher.publish(&RoomEvent::PaymentPrompt(prompt));
    }

    fn notify_counterparty(&self, offer: &Offer, recipient_id: Uuid) {
        self.notifier.dispatch(NotificationJob::OfferActivity {
            recipient_id,
            conversation_id: offer.conversation_id,
            offer_id: offer.id,
            status: offer.status,
        });
    }
}
