// Ask API: answer a question about roles, permissions and users through the
// generate-then-verify pipeline. Typed pipeline errors map onto status codes here.
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use crate::metrics;
use crate::shared_state::UnifiedAppState;

const ASK_ROUTE: &str = "/api/ask";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    metrics::inc_request(ASK_ROUTE, status.as_str());
    (status, Json(ErrorResponse { detail: detail.into() }))
}

/// POST /api/ask
///
/// 200 with `{"response": ...}` on success, 400 for an unusable question,
/// 408 when the answer budget runs out, 500 for completion failures.
pub async fn ask(
    State(state): State<UnifiedAppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let request_num = state.counters.inc_total_requests();
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("ask", %request_id, request_num);

    async move {
        let Json(req) = payload
            .map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

        info!("Received question ({} chars)", req.question.len());

        match state.orchestrator.answer(&req.question).await {
            Ok(response) => {
                info!("Answered question ({} chars)", response.len());
                metrics::inc_request(ASK_ROUTE, StatusCode::OK.as_str());
                Ok(Json(AskResponse { response }))
            }
            Err(e) => {
                let status = StatusCode::from_u16(e.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                warn!("Question failed with {}: {}", status, e);
                Err(api_error(status, e.to_string()))
            }
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
}

/// GET /
pub async fn home(State(state): State<UnifiedAppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: format!("{} is running", state.app_name),
    })
}
