use std::sync::{Arc, Mutex};

use actix_rt::test;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use negotiation_backend::api::dtos::CounterOfferRequest;
use negotiation_backend::application::OfferService;
use negotiation_backend::domain::{
    CounterTerms, DomainError, Offer, OfferStatus, OfferType, RoomEvent,
};
use negotiation_backend::error::{AppError, AppResult};
use negotiation_backend::infrastructure::notifications::LogNotificationDispatcher;
use negotiation_backend::infrastructure::repositories::OfferRepository;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::common::fixtures::{counter_request, Harness, COUNTER_VALIDITY_DAYS};
use crate::common::mocks::{MockOfferRepo, MockPaymentGateway, RecordingPublisher};

fn domain_error(result: AppResult<impl std::fmt::Debug>) -> DomainError {
    match result {
        Err(AppError::Domain(error)) => error,
        other => panic!("expected domain error, got {other:?}"),
    }
}

async fn pending_from_brand(h: &Harness) -> Offer {
    h.offers
        .create_offer(h.brand, h.offer_from(h.brand))
        .await
        .expect("offer should be created")
}

#[test]
async fn brand_offer_is_pending_brand_to_creator() {
    let h = Harness::new().await;

    let offer = pending_from_brand(&h).await;

    assert_eq!(offer.offer_type, OfferType::BrandToCreator);
    assert_eq!(offer.status, OfferStatus::Pending);
    assert_eq!(offer.sender_id, h.brand.user_id);
    assert_eq!(offer.recipient_id, h.creator.user_id);
    assert_eq!(h.publisher.events(), vec![RoomEvent::NewOffer(offer.clone())]);
    assert_eq!(h.notifier.jobs()[0].recipient_id(), h.creator.user_id);
}

#[test]
async fn creator_offer_is_creator_to_brand() {
    let h = Harness::new().await;

    let offer = h
        .offers
        .create_offer(h.creator, h.offer_from(h.creator))
        .await
        .unwrap();

    assert_eq!(offer.offer_type, OfferType::CreatorToBrand);
    assert_eq!(offer.brand_id(), h.brand.user_id);
}

#[test]
async fn fetched_offer_keeps_submitted_terms() {
    let h = Harness::new().await;
    let mut request = h.offer_from(h.brand);
    request.price = Decimal::new(500, 0);
    request.valid_until = Utc::now() + Duration::days(7);
    let valid_until = request.valid_until;

    let created = h.offers.create_offer(h.brand, request).await.unwrap();
    let fetched = h.offers.get_offer(h.creator.user_id, created.id).await.unwrap();

    assert_eq!(fetched.price, Decimal::new(500, 0));
    assert_eq!(fetched.delivery_time, 7);
    assert_eq!(fetched.revisions, 2);
    assert_eq!(fetched.currency, "USD");
    assert_eq!(fetched.valid_until, valid_until);
}

#[test]
async fn declared_type_must_match_role() {
    let h = Harness::new().await;
    let mut request = h.offer_from(h.brand);
    request.offer_type = Some(OfferType::CreatorToBrand);

    let error = domain_error(h.offers.create_offer(h.brand, request).await);

    assert!(matches!(
        error,
        DomainError::InvalidOfferFields(ref v) if v[0].field == "type"
    ));
}

#[test]
async fn recipient_must_be_the_other_participant() {
    let h = Harness::new().await;
    let mut request = h.offer_from(h.brand);
    request.recipient_id = Uuid::new_v4();

    let error = domain_error(h.offers.create_offer(h.brand, request).await);

    assert!(matches!(
        error,
        DomainError::InvalidOfferFields(ref v) if v[0].field == "recipient_id"
    ));
}

#[test]
async fn invalid_commercials_are_reported_per_field() {
    let h = Harness::new().await;
    let mut request = h.offer_from(h.brand);
    request.price = Decimal::ZERO;
    request.delivery_time = 0;
    request.valid_until = Utc::now() - Duration::minutes(1);

    let error = domain_error(h.offers.create_offer(h.brand, request).await);

    let DomainError::InvalidOfferFields(violations) = error else {
        panic!("expected field violations");
    };
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    assert!(fields.contains(&"price"));
    assert!(fields.contains(&"delivery_time"));
    assert!(fields.contains(&"valid_until"));
    assert!(h.offer_repo.offers.lock().expect("offers mutex poisoned").is_empty());
}

#[test]
async fn outsider_cannot_create_or_view() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    let outsider = negotiation_backend::domain::Actor::new(
        Uuid::new_v4(),
        negotiation_backend::domain::Role::Brand,
    );

    assert!(matches!(
        h.offers.create_offer(outsider, h.offer_from(h.brand)).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        h.offers.get_offer(outsider.user_id, offer.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        h.offers.list_offers(outsider.user_id, h.conversation_id()).await,
        Err(AppError::Forbidden(_))
    ));
}

#[test]
async fn recipient_accepts_and_brand_gets_payment_prompt() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    h.publisher.clear();

    let accepted = h.offers.accept_offer(h.creator.user_id, offer.id).await.unwrap();

    assert_eq!(accepted.status, OfferStatus::Accepted);
    let requests = h.payments.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].offer_id, offer.id);
    assert_eq!(requests[0].payer_id, h.brand.user_id);
    assert_eq!(requests[0].amount, offer.price);

    let events = h.publisher.events();
    assert_eq!(events[0], RoomEvent::OfferUpdated(accepted.clone()));
    let RoomEvent::PaymentPrompt(prompt) = &events[1] else {
        panic!("expected payment prompt, got {:?}", events[1]);
    };
    assert_eq!(prompt.brand_id, h.brand.user_id);
    assert_eq!(prompt.amount, offer.price);
    assert!(prompt.checkout_reference.is_some());
    assert!(prompt.call_to_action.contains("USD"));
}

#[test]
async fn creator_offer_acceptance_has_no_payment_prompt() {
    let h = Harness::new().await;
    let offer = h
        .offers
        .create_offer(h.creator, h.offer_from(h.creator))
        .await
        .unwrap();
    h.publisher.clear();

    h.offers.accept_offer(h.brand.user_id, offer.id).await.unwrap();

    assert_eq!(h.publisher.names(), vec!["offer_updated"]);
    assert!(h.payments.requests().is_empty());
}

#[test]
async fn payment_outage_keeps_acceptance_and_checkout_can_retry() {
    let h = Harness::new().await;
    h.payments.set_failing(true);
    let offer = pending_from_brand(&h).await;
    h.publisher.clear();

    let accepted = h.offers.accept_offer(h.creator.user_id, offer.id).await.unwrap();

    assert_eq!(accepted.status, OfferStatus::Accepted);
    let RoomEvent::PaymentPrompt(prompt) = &h.publisher.events()[1] else {
        panic!("expected payment prompt");
    };
    assert_eq!(prompt.checkout_reference, None);

    assert!(matches!(
        h.offers.initiate_checkout(h.brand.user_id, offer.id).await,
        Err(AppError::Upstream { .. })
    ));

    h.payments.set_failing(false);
    let checkout = h
        .offers
        .initiate_checkout(h.brand.user_id, offer.id)
        .await
        .unwrap();
    assert_eq!(checkout.offer_id, offer.id);
    assert!(checkout.checkout_reference.starts_with("chk_"));
}

#[test]
async fn checkout_is_brand_only_and_needs_acceptance() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    assert!(matches!(
        domain_error(h.offers.initiate_checkout(h.brand.user_id, offer.id).await),
        DomainError::InvalidTransition(_)
    ));
    h.offers.accept_offer(h.creator.user_id, offer.id).await.unwrap();
    assert!(matches!(
        h.offers.initiate_checkout(h.creator.user_id, offer.id).await,
        Err(AppError::Forbidden(_))
    ));
}

#[test]
async fn only_recipient_may_answer() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    assert_eq!(
        domain_error(h.offers.accept_offer(h.brand.user_id, offer.id).await),
        DomainError::NotRecipient
    );
    assert_eq!(
        domain_error(h.offers.reject_offer(Uuid::new_v4(), offer.id).await),
        DomainError::NotRecipient
    );
    assert_eq!(h.offer_repo.stored(offer.id).unwrap().status, OfferStatus::Pending);
}

#[test]
async fn rejected_is_terminal() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    let rejected = h.offers.reject_offer(h.creator.user_id, offer.id).await.unwrap();
    assert_eq!(rejected.status, OfferStatus::Rejected);

    let error = domain_error(h.offers.accept_offer(h.creator.user_id, offer.id).await);
    assert!(matches!(&error, DomainError::InvalidTransition(current) if current.status == OfferStatus::Rejected));
    assert!(matches!(
        domain_error(h.offers.reject_offer(h.creator.user_id, offer.id).await),
        DomainError::AlreadyActedUpon(_)
    ));
}

#[test]
async fn counter_records_terms_and_keeps_original_commercials() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    let countered = h
        .offers
        .counter_offer(h.creator.user_id, offer.id, counter_request(600))
        .await
        .unwrap();

    assert_eq!(countered.status, OfferStatus::Countered);
    assert_eq!(countered.price, offer.price);
    let counter = countered.counter_offer.as_ref().unwrap();
    assert_eq!(counter.price, Decimal::new(600, 0));
    assert_eq!(counter.delivery_time, 10);
}

#[test]
async fn price_only_counter_keeps_remaining_terms_of_original() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    let request = CounterOfferRequest {
        price: Decimal::new(600, 0),
        delivery_time: None,
        revisions: None,
        terms: None,
        message: None,
    };

    let countered = h
        .offers
        .counter_offer(h.creator.user_id, offer.id, request)
        .await
        .unwrap();

    let counter = countered.counter_offer.as_ref().unwrap();
    assert_eq!(counter.price, Decimal::new(600, 0));
    assert_eq!(counter.delivery_time, offer.delivery_time);
    assert_eq!(counter.revisions, offer.revisions);
    assert_eq!(counter.terms, offer.terms);

    let follow_up = h.offers.accept_counter(h.brand.user_id, offer.id).await.unwrap();
    assert_eq!(follow_up.price, Decimal::new(600, 0));
    assert_eq!(follow_up.revisions, offer.revisions);
    assert_eq!(follow_up.delivery_time, offer.delivery_time);
}

#[test]
async fn counter_with_bad_terms_is_rejected() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    let mut request = counter_request(0);
    request.revisions = Some(-1);

    let error = domain_error(
        h.offers
            .counter_offer(h.creator.user_id, offer.id, request)
            .await,
    );

    assert!(matches!(error, DomainError::InvalidOfferFields(ref v) if v.len() == 2));
    assert_eq!(h.offer_repo.stored(offer.id).unwrap().status, OfferStatus::Pending);
}

#[test]
async fn accept_counter_spawns_flipped_offer_and_keeps_history() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    h.offers
        .counter_offer(h.creator.user_id, offer.id, counter_request(600))
        .await
        .unwrap();
    h.publisher.clear();

    let follow_up = h.offers.accept_counter(h.brand.user_id, offer.id).await.unwrap();

    assert_ne!(follow_up.id, offer.id);
    assert_eq!(follow_up.status, OfferStatus::Pending);
    assert_eq!(follow_up.offer_type, OfferType::CreatorToBrand);
    assert_eq!(follow_up.price, Decimal::new(600, 0));
    assert_eq!(follow_up.sender_id, h.creator.user_id);
    assert_eq!(follow_up.recipient_id, h.brand.user_id);
    assert_eq!(follow_up.deliverables, offer.deliverables);
    assert_eq!(follow_up.terms, offer.terms);
    assert_eq!(follow_up.parent_offer_id, Some(offer.id));
    let validity = follow_up.valid_until - follow_up.created_at;
    assert_eq!(validity, Duration::days(COUNTER_VALIDITY_DAYS));

    let original = h.offer_repo.stored(offer.id).unwrap();
    assert_eq!(original.status, OfferStatus::Countered);
    assert_eq!(original.follow_up_offer_id, Some(follow_up.id));
    assert_eq!(h.publisher.names(), vec!["offer_updated", "new_offer"]);
}

#[test]
async fn accept_counter_is_for_original_sender_once() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    assert!(matches!(
        domain_error(h.offers.accept_counter(h.brand.user_id, offer.id).await),
        DomainError::InvalidTransition(_)
    ));
    h.offers
        .counter_offer(h.creator.user_id, offer.id, counter_request(650))
        .await
        .unwrap();

    assert_eq!(
        domain_error(h.offers.accept_counter(h.creator.user_id, offer.id).await),
        DomainError::NotSender
    );
    h.offers.accept_counter(h.brand.user_id, offer.id).await.unwrap();
    assert!(matches!(
        domain_error(h.offers.accept_counter(h.brand.user_id, offer.id).await),
        DomainError::AlreadyActedUpon(_)
    ));
}

#[test]
async fn lapsed_offer_refuses_every_action_without_persisting() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    h.offer_repo.update(offer.id, |o| {
        o.valid_until = Utc::now() - Duration::seconds(1);
    });

    for result in [
        h.offers.accept_offer(h.creator.user_id, offer.id).await,
        h.offers.reject_offer(h.creator.user_id, offer.id).await,
        h.offers
            .counter_offer(h.creator.user_id, offer.id, counter_request(600))
            .await,
    ] {
        let error = domain_error(result);
        assert!(matches!(&error, DomainError::OfferExpired(current) if current.status == OfferStatus::Expired));
    }

    assert_eq!(h.offer_repo.stored(offer.id).unwrap().status, OfferStatus::Pending);
    let listed = h
        .offers
        .list_offers(h.brand.user_id, h.conversation_id())
        .await
        .unwrap();
    assert_eq!(listed[0].status, OfferStatus::Expired);
}

#[test]
async fn sweeper_persists_expiry_and_notifies_sender() {
    let h = Harness::new().await;
    let stale = pending_from_brand(&h).await;
    let fresh = pending_from_brand(&h).await;
    let countered = pending_from_brand(&h).await;
    h.offers
        .counter_offer(h.creator.user_id, countered.id, counter_request(700))
        .await
        .unwrap();
    let lapsed = Utc::now() - Duration::hours(1);
    h.offer_repo.update(stale.id, |o| o.valid_until = lapsed);
    h.offer_repo.update(countered.id, |o| o.valid_until = lapsed);
    h.publisher.clear();

    let moved = h.offers.expire_stale_offers(Utc::now()).await.unwrap();

    assert_eq!(moved, 1);
    assert_eq!(h.offer_repo.stored(stale.id).unwrap().status, OfferStatus::Expired);
    assert_eq!(h.offer_repo.stored(fresh.id).unwrap().status, OfferStatus::Pending);
    assert_eq!(h.offer_repo.stored(countered.id).unwrap().status, OfferStatus::Countered);
    assert_eq!(h.publisher.names(), vec!["offer_updated"]);
    let last_job = h.notifier.jobs().pop().unwrap();
    assert_eq!(last_job.recipient_id(), h.brand.user_id);

    assert_eq!(h.offers.expire_stale_offers(Utc::now()).await.unwrap(), 0);
}

#[test]
async fn sweeper_drains_more_than_one_batch() {
    let h = Harness::new().await;
    let lapsed = Utc::now() - Duration::minutes(5);
    for _ in 0..130 {
        let offer = pending_from_brand(&h).await;
        h.offer_repo.update(offer.id, |o| o.valid_until = lapsed);
    }

    let moved = h.offers.expire_stale_offers(Utc::now()).await.unwrap();

    assert_eq!(moved, 130);
}

/// Serves one stale read of an offer, as if another writer moved it between
/// the service's load and its conditional write.
struct StaleReadRepo {
    inner: MockOfferRepo,
    stale: Mutex<Option<Offer>>,
}

#[async_trait]
impl OfferRepository for StaleReadRepo {
    async fn create(&self, offer: &Offer) -> AppResult<Offer> {
        self.inner.create(offer).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Offer>> {
        if let Some(stale) = self.stale.lock().expect("stale mutex poisoned").take() {
            return Ok(Some(stale));
        }
        self.inner.find_by_id(id).await
    }

    async fn find_by_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<Offer>> {
        self.inner.find_by_conversation(conversation_id).await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OfferStatus,
        next: OfferStatus,
        counter: Option<&CounterTerms>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Offer>> {
        self.inner
            .transition_status(id, expected, next, counter, now)
            .await
    }

    async fn spawn_follow_up(&self, original_id: Uuid, follow_up: &Offer) -> AppResult<Option<Offer>> {
        self.inner.spawn_follow_up(original_id, follow_up).await
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Offer>> {
        self.inner.find_expired_pending(now, limit).await
    }

    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Offer>> {
        self.inner.mark_expired(id, now).await
    }
}

#[test]
async fn losing_the_race_reports_the_winner_state() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;
    let mut accepted = offer.clone();
    accepted.status = OfferStatus::Accepted;

    let repo = Arc::new(StaleReadRepo {
        inner: MockOfferRepo::default(),
        stale: Mutex::new(Some(offer.clone())),
    });
    repo.inner.insert(accepted);
    let publisher = Arc::new(RecordingPublisher::default());
    let service = OfferService::new(
        repo,
        h.message_repo.clone(),
        publisher.clone(),
        Arc::new(MockPaymentGateway::default()),
        Arc::new(LogNotificationDispatcher),
        Duration::days(COUNTER_VALIDITY_DAYS),
    );

    let error = domain_error(service.reject_offer(h.creator.user_id, offer.id).await);

    assert!(matches!(&error, DomainError::InvalidTransition(current) if current.status == OfferStatus::Accepted));
    assert!(publisher.events().is_empty());
}

#[test]
async fn concurrent_accept_and_reject_have_one_winner() {
    let h = Harness::new().await;
    let offer = pending_from_brand(&h).await;

    let (accepted, rejected) = tokio::join!(
        h.offers.accept_offer(h.creator.user_id, offer.id),
        h.offers.reject_offer(h.creator.user_id, offer.id),
    );

    let outcomes = [accepted.is_ok(), rejected.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if accepted.is_ok() { rejected.map(|_| ()) } else { accepted.map(|_| ()) };
    assert!(matches!(
        loser,
        Err(AppError::Domain(DomainError::InvalidTransition(_)))
    ));
}
