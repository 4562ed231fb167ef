use crate::error::ProxyError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use sparql_proxy_scheduler::JobSummary;

/// `GET /jobs/{token}`: status of the most recent job submitted under the
/// client-supplied token.
pub(crate) async fn handle_job_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<JobSummary>, ProxyError> {
    state
        .queue
        .job_status(&token)
        .map(Json)
        .ok_or(ProxyError::JobNotFound)
}
