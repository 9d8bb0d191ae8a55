//! End-to-end negotiations across the three services.

use actix_rt::test;
use negotiation_backend::domain::{OfferStatus, OfferType, RoomEvent};
use rust_decimal::Decimal;

use crate::common::fixtures::{counter_request, Harness};

#[test]
async fn brand_offer_countered_then_settled_by_creator_offer() {
    let h = Harness::new().await;
    h.say(h.brand, "Hi! Interested in a reel for our launch?").await;
    h.say(h.creator, "Sure, send over the details").await;

    let opening = h
        .offers
        .create_offer(h.brand, h.offer_from(h.brand))
        .await
        .unwrap();
    assert_eq!(opening.price, Decimal::new(500, 0));

    h.offers
        .counter_offer(h.creator.user_id, opening.id, counter_request(600))
        .await
        .unwrap();
    let follow_up = h
        .offers
        .accept_counter(h.brand.user_id, opening.id)
        .await
        .unwrap();

    assert_eq!(follow_up.offer_type, OfferType::CreatorToBrand);
    assert_eq!(follow_up.price, Decimal::new(600, 0));
    assert_eq!(follow_up.status, OfferStatus::Pending);

    h.publisher.clear();
    let accepted = h
        .offers
        .accept_offer(h.brand.user_id, follow_up.id)
        .await
        .unwrap();
    assert_eq!(accepted.status, OfferStatus::Accepted);
    // Creator-to-brand acceptance settles without a payment prompt.
    assert_eq!(h.publisher.names(), vec!["offer_updated"]);

    let history = h
        .offers
        .list_offers(h.creator.user_id, h.conversation_id())
        .await
        .unwrap();
    let statuses: Vec<OfferStatus> = history.iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![OfferStatus::Countered, OfferStatus::Accepted]);
}

#[test]
async fn brand_offer_accepted_outright_prompts_brand_to_pay() {
    let h = Harness::new().await;
    let offer = h
        .offers
        .create_offer(h.brand, h.offer_from(h.brand))
        .await
        .unwrap();

    h.offers.accept_offer(h.creator.user_id, offer.id).await.unwrap();

    let prompt = h
        .publisher
        .events()
        .into_iter()
        .find_map(|event| match event {
            RoomEvent::PaymentPrompt(prompt) => Some(prompt),
            _ => None,
        })
        .expect("payment prompt should be published");
    assert_eq!(prompt.brand_id, h.brand.user_id);
    assert_eq!(prompt.offer_id, offer.id);
    assert_eq!(prompt.amount, Decimal::new(500, 0));
}

#[test]
async fn unread_counts_follow_sends_and_reads() {
    let h = Harness::new().await;
    for text in ["one", "two", "three"] {
        h.say(h.brand, text).await;
    }

    assert_eq!(h.conversations.total_unread(h.creator.user_id).await.unwrap(), 3);
    assert_eq!(h.conversations.total_unread(h.brand.user_id).await.unwrap(), 0);

    let read = h
        .messages
        .mark_read(h.creator.user_id, h.conversation_id())
        .await
        .unwrap();
    assert_eq!(read.updated_count, 3);
    assert_eq!(h.conversations.total_unread(h.creator.user_id).await.unwrap(), 0);

    h.say(h.creator, "reply").await;
    assert_eq!(h.conversations.total_unread(h.brand.user_id).await.unwrap(), 1);
    let brand_view = h
        .conversations
        .get_conversation(h.brand.user_id, h.conversation_id())
        .await
        .unwrap();
    assert_eq!(brand_view.unread_count, 1);
    assert_eq!(
        brand_view.last_message.map(|m| m.preview),
        Some("reply".to_string())
    );
}

#[test]
async fn room_sees_every_step_in_order() {
    let h = Harness::new().await;
    h.say(h.brand, "Offer incoming").await;
    let offer = h
        .offers
        .create_offer(h.brand, h.offer_from(h.brand))
        .await
        .unwrap();
    h.messages
        .mark_read(h.creator.user_id, h.conversation_id())
        .await
        .unwrap();
    h.offers.reject_offer(h.creator.user_id, offer.id).await.unwrap();

    assert_eq!(
        h.publisher.names(),
        vec!["new_message", "new_offer", "message_read", "offer_updated"]
    );
    assert!(h
        .publisher
        .events()
        .iter()
        .all(|event| event.conversation_id() == h.conversation_id()));
}
