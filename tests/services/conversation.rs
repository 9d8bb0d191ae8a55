use actix_rt::test;
use negotiation_backend::domain::{Actor, DomainError, Role};
use negotiation_backend::error::AppError;
use uuid::Uuid;

use crate::common::fixtures::Harness;

#[test]
async fn get_or_create_ignores_participant_order() {
    let h = Harness::new().await;

    let again = h
        .conversations
        .get_or_create(h.creator.user_id, h.brand.user_id)
        .await
        .unwrap();

    assert_eq!(again.id, h.conversation_id());
    assert_eq!(
        h.message_repo.conversations.lock().expect("conversations mutex poisoned").len(),
        1
    );
}

#[test]
async fn conversation_with_self_is_rejected() {
    let h = Harness::new().await;

    let result = h
        .conversations
        .get_or_create(h.brand.user_id, h.brand.user_id)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Domain(DomainError::InvalidParticipants(_)))
    ));
}

#[test]
async fn outsider_cannot_read_conversation() {
    let h = Harness::new().await;

    let result = h
        .conversations
        .get_conversation(Uuid::new_v4(), h.conversation_id())
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
async fn unknown_conversation_is_not_found() {
    let h = Harness::new().await;

    let result = h
        .conversations
        .get_conversation(h.brand.user_id, Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[test]
async fn list_puts_recent_activity_first_and_silent_conversations_last() {
    let h = Harness::new().await;
    let other_creator = Actor::new(Uuid::new_v4(), Role::Creator);
    let quiet_creator = Actor::new(Uuid::new_v4(), Role::Creator);
    let busy = h
        .conversations
        .get_or_create(h.brand.user_id, other_creator.user_id)
        .await
        .unwrap();
    let quiet = h
        .conversations
        .get_or_create(h.brand.user_id, quiet_creator.user_id)
        .await
        .unwrap();

    h.say(h.creator, "first").await;
    h.messages
        .send_message(
            other_creator.user_id,
            busy.id,
            crate::common::fixtures::text_request("later"),
        )
        .await
        .unwrap();

    let listed = h.conversations.list_conversations(h.brand.user_id).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|c| c.id).collect();

    assert_eq!(ids, vec![busy.id, h.conversation_id(), quiet.id]);
    assert_eq!(listed[0].other_participant_id, other_creator.user_id);
    assert_eq!(listed[0].last_message.as_ref().unwrap().preview, "later");
    assert!(listed[2].last_message.is_none());
}

#[test]
async fn unread_counts_are_per_viewer_and_summed() {
    let h = Harness::new().await;
    let other_creator = Actor::new(Uuid::new_v4(), Role::Creator);
    let second = h
        .conversations
        .get_or_create(h.brand.user_id, other_creator.user_id)
        .await
        .unwrap();

    h.say(h.creator, "one").await;
    h.say(h.creator, "two").await;
    h.messages
        .send_message(
            other_creator.user_id,
            second.id,
            crate::common::fixtures::text_request("three"),
        )
        .await
        .unwrap();

    let brand_view = h
        .conversations
        .get_conversation(h.brand.user_id, h.conversation_id())
        .await
        .unwrap();
    let creator_view = h
        .conversations
        .get_conversation(h.creator.user_id, h.conversation_id())
        .await
        .unwrap();

    assert_eq!(brand_view.unread_count, 2);
    assert_eq!(creator_view.unread_count, 0);
    assert_eq!(h.conversations.total_unread(h.brand.user_id).await.unwrap(), 3);
    assert_eq!(h.conversations.total_unread(h.creator.user_id).await.unwrap(), 0);
}
