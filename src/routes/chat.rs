use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{MatchError, MatchingEngine};
use crate::models::{
    CancelMatchBody, CancelResponse, ChatMode, ErrorResponse, Gender, GenderPreference,
    HealthResponse, MatchOutcome, MatchPreferences, MatchResponse, MatchStatus, PreferencesBody,
    QueuePositionResponse, QueueStatsResponse, RequestMatchBody,
};
use crate::services::SessionStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
    pub store: Arc<dyn SessionStore>,
}

/// Configure all matchmaking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/chat/match", web::post().to(request_match))
        .route("/chat/cancel", web::post().to(cancel_match))
        .route("/chat/queue/stats", web::get().to(queue_stats))
        .route("/chat/queue/position", web::get().to(queue_position));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);
    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Request a chat partner
///
/// POST /api/v1/chat/match
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "mode": "text|audio|video",
///   "preferences": {
///     "genderPreference": "any|male|female",
///     "language": "en",
///     "interests": ["string"],
///     "ageRange": [18, 30]
///   },
///   "userGender": "male|female|others"
/// }
/// ```
async fn request_match(
    state: web::Data<AppState>,
    req: web::Json<RequestMatchBody>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("validation failed for match request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let mode = match parse_mode(&req.mode) {
        Ok(mode) => mode,
        Err(err) => return error_response(&err),
    };
    let preferences = match parse_preferences(&req.preferences) {
        Ok(preferences) => preferences,
        Err(err) => return error_response(&err),
    };
    let user_gender = match parse_user_gender(req.user_gender.as_deref()) {
        Ok(gender) => gender,
        Err(err) => return error_response(&err),
    };

    match state
        .engine
        .request_match(&req.user_id, mode, preferences, user_gender)
        .await
    {
        Ok(MatchOutcome::Matched { session }) => HttpResponse::Ok().json(MatchResponse {
            status: MatchStatus::Matched,
            session: Some(session),
            position: None,
            estimated_wait_secs: None,
        }),
        Ok(MatchOutcome::Queued {
            position,
            estimated_wait_secs,
        }) => HttpResponse::Ok().json(MatchResponse {
            status: MatchStatus::Queued,
            session: None,
            position: Some(position),
            estimated_wait_secs: Some(estimated_wait_secs),
        }),
        Err(err) => error_response(&err),
    }
}

/// Withdraw a pending match request
///
/// POST /api/v1/chat/cancel
async fn cancel_match(
    state: web::Data<AppState>,
    req: web::Json<CancelMatchBody>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let mode = match parse_mode(&req.mode) {
        Ok(mode) => mode,
        Err(err) => return error_response(&err),
    };

    let removed = state.engine.cancel(&req.user_id, mode);
    HttpResponse::Ok().json(CancelResponse {
        success: true,
        removed,
    })
}

/// Waiting counts per mode
///
/// GET /api/v1/chat/queue/stats
async fn queue_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(QueueStatsResponse {
        stats: state.engine.queue_stats(),
        timestamp: chrono::Utc::now(),
    })
}

/// Position of a waiting user in their mode queue
///
/// GET /api/v1/chat/queue/position?userId={userId}&mode={mode}
async fn queue_position(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let user_id = match query.get("userId") {
        Some(id) => id,
        None => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "missing_parameter".to_string(),
                message: "userId query parameter is required".to_string(),
                status_code: 400,
            });
        }
    };
    let mode = match parse_mode(query.get("mode").map(String::as_str).unwrap_or("text")) {
        Ok(mode) => mode,
        Err(err) => return error_response(&err),
    };

    HttpResponse::Ok().json(QueuePositionResponse {
        user_id: user_id.clone(),
        mode: mode.as_str().to_string(),
        position: state.engine.queue_position(user_id, mode),
    })
}

fn parse_mode(raw: &str) -> Result<ChatMode, MatchError> {
    ChatMode::parse(raw).ok_or_else(|| MatchError::InvalidMode(raw.to_string()))
}

fn parse_user_gender(raw: Option<&str>) -> Result<Option<Gender>, MatchError> {
    match raw {
        None => Ok(None),
        Some(s) => Gender::parse(s)
            .map(Some)
            .ok_or_else(|| MatchError::InvalidPreference(s.to_string())),
    }
}

/// Parse the wire preferences into the typed domain form. All values are
/// checked here, before any queue interaction.
fn parse_preferences(body: &PreferencesBody) -> Result<MatchPreferences, MatchError> {
    let gender_preference = GenderPreference::parse(&body.gender_preference)
        .ok_or_else(|| MatchError::InvalidPreference(body.gender_preference.clone()))?;

    let age_range = match body.age_range {
        None => None,
        Some([min, max]) if min <= max => Some((min, max)),
        Some([min, max]) => {
            return Err(MatchError::InvalidPreference(format!(
                "ageRange [{}, {}]",
                min, max
            )));
        }
    };

    Ok(MatchPreferences {
        gender_preference,
        language: body.language.clone(),
        interests: body.interests.clone(),
        age_range,
    })
}

fn error_response(err: &MatchError) -> HttpResponse {
    let (error, status_code) = match err {
        MatchError::DuplicateRequest(_) => ("duplicate_request", 409),
        MatchError::InvalidMode(_) => ("invalid_mode", 400),
        MatchError::InvalidPreference(_) => ("invalid_preference", 400),
    };

    let body = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    };

    match status_code {
        409 => HttpResponse::Conflict().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}
