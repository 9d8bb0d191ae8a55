use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use negotiation_backend::domain::Role;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::bearer;
use crate::common::fixtures::Harness;

#[actix_rt::test]
async fn requests_without_token_are_unauthorized() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/conversations")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[actix_rt::test]
async fn garbage_token_is_rejected() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/conversations")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn starting_a_conversation_is_idempotent() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(h.creator.user_id, Role::Creator))
        .set_json(json!({ "participant_id": h.brand.user_id }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["id"], h.conversation_id().to_string());
    assert_eq!(body["other_participant_id"], h.brand.user_id.to_string());
}

#[actix_rt::test]
async fn conversation_with_self_is_bad_request() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/conversations")
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .set_json(json!({ "participant_id": h.brand.user_id }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "INVALID_PARTICIPANTS");
}

#[actix_rt::test]
async fn send_then_list_messages() {
    let h = Harness::new().await;
    let app = init_app!(h);
    let uri = format!("/api/v1/conversations/{}/messages", h.conversation_id());

    let send = actix_test::TestRequest::post()
        .uri(&uri)
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .set_json(json!({ "content": "  Hello there  " }))
        .to_request();
    let response = actix_test::call_service(&app, send).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sent: Value = actix_test::read_body_json(response).await;
    assert_eq!(sent["content"], "Hello there");
    assert_eq!(sent["is_read"], false);

    let list = actix_test::TestRequest::get()
        .uri(&format!("{uri}?page=1"))
        .insert_header(bearer(h.creator.user_id, Role::Creator))
        .to_request();
    let response = actix_test::call_service(&app, list).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Vec<Value> = actix_test::read_body_json(response).await;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"], sent["id"]);
}

#[actix_rt::test]
async fn empty_message_is_bad_request() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/conversations/{}/messages", h.conversation_id()))
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .set_json(json!({ "content": "   " }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "EMPTY_MESSAGE");
}

#[actix_rt::test]
async fn page_zero_is_rejected() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{}/messages?page=0", h.conversation_id()))
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn outsider_gets_forbidden_and_unknown_gets_not_found() {
    let h = Harness::new().await;
    let app = init_app!(h);

    let outsider = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{}", h.conversation_id()))
        .insert_header(bearer(Uuid::new_v4(), Role::Brand))
        .to_request();
    let response = actix_test::call_service(&app, outsider).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let unknown = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/conversations/{}", Uuid::new_v4()))
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .to_request();
    let response = actix_test::call_service(&app, unknown).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn mark_read_clears_unread_total() {
    let h = Harness::new().await;
    h.say(h.brand, "first").await;
    h.say(h.brand, "second").await;
    let app = init_app!(h);

    let unread = actix_test::TestRequest::get()
        .uri("/api/v1/conversations/unread")
        .insert_header(bearer(h.creator.user_id, Role::Creator))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, unread).await;
    assert_eq!(body["total"], 2);

    let read = actix_test::TestRequest::post()
        .uri(&format!("/api/v1/conversations/{}/read", h.conversation_id()))
        .insert_header(bearer(h.creator.user_id, Role::Creator))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, read).await;
    assert_eq!(body["updated_count"], 2);
    assert_eq!(body["message_ids"].as_array().map(Vec::len), Some(2));

    let unread = actix_test::TestRequest::get()
        .uri("/api/v1/conversations/unread")
        .insert_header(bearer(h.creator.user_id, Role::Creator))
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, unread).await;
    assert_eq!(body["total"], 0);
}

#[actix_rt::test]
async fn list_orders_by_latest_activity() {
    let h = Harness::new().await;
    let other_creator = Uuid::new_v4();
    let quiet = h
        .conversations
        .get_or_create(h.brand.user_id, other_creator)
        .await
        .unwrap();
    h.say(h.brand, "active thread").await;
    let app = init_app!(h);

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/conversations")
        .insert_header(bearer(h.brand.user_id, Role::Brand))
        .to_request();
    let body: Vec<Value> = actix_test::call_and_read_body_json(&app, request).await;

    let ids: Vec<&str> = body.iter().filter_map(|c| c["id"].as_str()).collect();
    assert_eq!(ids, vec![h.conversation_id().to_string(), quiet.id.to_string()]);
}
