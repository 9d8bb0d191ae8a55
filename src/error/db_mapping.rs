use super::app_error::AppError;

const DB_UNREACHABLE: &str = "Unable to connect to database. Please try again later.";
const DB_BUSY: &str = "Service temporarily unavailable. Please try again later.";

pub(super) fn database_unavailable(message: &str) -> AppError {
    AppError::ServiceUnavailable {
        service: "database".to_string(),
        message: message.to_string(),
    }
}

pub(super) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Io(_) => database_unavailable(DB_UNREACHABLE),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => database_unavailable(DB_BUSY),
        sqlx::Error::Database(database_error) => map_database_error(
            database_error.code().as_deref(),
            database_error.constraint(),
            database_error.message(),
        )
        .unwrap_or(AppError::DatabaseError(sqlx::Error::Database(database_error))),
        other => AppError::DatabaseError(other),
    }
}

pub(super) fn map_database_error(
    code: Option<&str>,
    constraint: Option<&str>,
    message: &str,
) -> Option<AppError> {
    match code {
        Some("23505") => Some(AppError::Conflict(
            conflict_message_from_constraint(constraint).to_string(),
        )),
        Some("23502") => Some(AppError::validation_error(
            required_field_message_from_db(message)
                .unwrap_or_else(|| "required field is missing".to_string()),
        )),
        Some("23503") => Some(AppError::NotFound(
            reference_message_from_constraint(constraint).to_string(),
        )),
        Some("23514") => Some(AppError::validation_error(
            check_message_from_constraint(constraint),
        )),
        Some("22P02") => Some(AppError::validation_error("invalid input format")),
        Some("08001") | Some("08006") => Some(database_unavailable(DB_UNREACHABLE)),
        // 57014 is raised when statement_timeout cancels a query.
        Some("53300") | Some("57014") => Some(database_unavailable(DB_BUSY)),
        Some("55P03") | Some("40001") | Some("40P01") => Some(AppError::Conflict(
            "Resource is currently locked. Please try again.".to_string(),
        )),
        _ => None,
    }
}

pub(super) fn conflict_message_from_constraint(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("conversations_participant_pair_key") => "conversation already exists",
        Some("messages_client_message_key") => "message already sent",
        Some("offers_follow_up_offer_id_key") => "counter offer has already been accepted",
        _ => "resource already exists",
    }
}

fn reference_message_from_constraint(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("messages_conversation_id_fkey") | Some("offers_conversation_id_fkey") => {
            "conversation not found"
        }
        Some("offers_parent_offer_id_fkey") => "offer not found",
        _ => "referenced resource does not exist",
    }
}

fn check_message_from_constraint(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("offers_price_positive") => "price must be greater than zero",
        Some("offers_delivery_time_positive") => "delivery_time must be at least one day",
        Some("offers_revisions_non_negative") => "revisions cannot be negative",
        Some("messages_has_body") => "message must have text content or an attachment",
        Some("conversations_participants_ordered") => {
            "a conversation needs two distinct participants"
        }
        _ => "request violates validation rules",
    }
}

pub(super) fn required_field_message_from_db(message: &str) -> Option<String> {
    let marker = "column \"";
    let rest = &message[message.find(marker)? + marker.len()..];
    let field = &rest[..rest.find('"')?];
    Some(format!("{field} is required"))
}
