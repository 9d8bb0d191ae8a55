use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dtos;
use crate::domain;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::routes::conversations::list_conversations,
        crate::api::routes::conversations::start_conversation,
        crate::api::routes::conversations::unread_total,
        crate::api::routes::conversations::get_conversation,
        crate::api::routes::conversations::list_messages,
        crate::api::routes::conversations::send_message,
        crate::api::routes::conversations::mark_read,
        crate::api::routes::conversations::list_offers,
        crate::api::routes::offers::create_offer,
        crate::api::routes::offers::get_offer,
        crate::api::routes::offers::accept_offer,
        crate::api::routes::offers::reject_offer,
        crate::api::routes::offers::counter_offer,
        crate::api::routes::offers::accept_counter,
        crate::api::routes::offers::checkout,
        crate::api::routes::health,
        crate::api::routes::ready,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::ValidationIssueDto,
            dtos::CreateConversationRequest,
            dtos::ConversationResponse,
            dtos::UnreadTotalResponse,
            dtos::FileReference,
            dtos::SendMessageRequest,
            dtos::MarkReadResponse,
            dtos::CreateOfferRequest,
            dtos::CounterOfferRequest,
            dtos::CheckoutResponse,
            domain::LastMessage,
            domain::Message,
            domain::MessageType,
            domain::Offer,
            domain::OfferType,
            domain::OfferStatus,
            domain::CounterTerms,
            domain::PaymentPrompt,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "conversations", description = "Two-party conversations and unread counts"),
        (name = "messages", description = "Chat messages and read receipts"),
        (name = "offers", description = "Offer negotiation state machine"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Negotiation Backend API",
        version = "0.1.0",
        description = "Real-time brand and creator negotiation messaging"
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn configure_swagger_ui(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
