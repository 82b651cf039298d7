//! Voting cycle endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;
use voting_common::AppResult;
use voting_core::{
    AnnouncedWinner, CastBallotInput, CastReceipt, CheckEmployeeInput, CycleInput, CycleReport,
    CycleSummary, CycleView, CycleWinners, Eligibility, HistoryEntry, InviteCastInput,
    InviteReport, NotificationReport, NotifyLocationInput, OfficialWinners, SendInvitesInput,
    VoterRoster,
};

use crate::{response::ApiResponse, state::AppState};

/// Create the voting cycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cycles).post(create_cycle))
        .route("/winners/history", get(winners_history))
        .route("/{id}", put(update_cycle).delete(delete_cycle))
        .route("/{id}/voters", get(list_voters))
        .route("/{id}/report", get(cycle_report))
        .route("/{id}/winners", get(cycle_winners))
        .route("/{id}/official-winners", get(official_winners))
        .route("/{id}/announce-winner", post(announce_winner))
        .route("/{id}/check-employee", post(check_employee))
        .route("/{id}/cast", post(cast_ballot))
        .route("/{id}/send-invites", post(send_invites))
        .route("/{id}/invite/{token}", get(invite_details))
        .route("/{id}/invite/{token}/cast", post(cast_invited_ballot))
        .route("/{id}/notify-winners", post(notify_winners))
        .route("/{id}/notify-location-winner", post(notify_location_winner))
}

/// Announce winner request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceWinnerRequest {
    #[validate(length(min = 1, message = "locationId is required"))]
    pub location_id: String,
    #[validate(length(min = 1, message = "nomineeId is required"))]
    pub nominee_id: String,
}

// ==================== Administration ====================

/// List cycles, newest first.
async fn list_cycles(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<CycleSummary>>> {
    let cycles = state.cycle_service.list().await?;
    Ok(ApiResponse::ok(cycles))
}

/// Create a cycle.
async fn create_cycle(
    State(state): State<AppState>,
    Json(input): Json<CycleInput>,
) -> AppResult<ApiResponse<CycleView>> {
    let cycle = state.cycle_service.create(input).await?;
    info!(cycle_id = %cycle.id, "Cycle created via API");
    Ok(ApiResponse::created(cycle))
}

/// Replace a cycle's definition.
async fn update_cycle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CycleInput>,
) -> AppResult<ApiResponse<CycleView>> {
    let cycle = state.cycle_service.update(&id, input).await?;
    Ok(ApiResponse::ok(cycle))
}

/// Delete a cycle with its ballots, winners and invites.
async fn delete_cycle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.cycle_service.delete(&id).await?;
    Ok(crate::response::ok())
}

/// Voter roster with participation.
async fn list_voters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<VoterRoster>> {
    let roster = state.cycle_service.voters(&id).await?;
    Ok(ApiResponse::ok(roster))
}

// ==================== Results ====================

/// Full tally report.
async fn cycle_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CycleReport>> {
    let report = state.results_service.report(&id).await?;
    Ok(ApiResponse::ok(report))
}

/// Per-location standings with resolved winners.
async fn cycle_winners(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CycleWinners>> {
    let winners = state.results_service.winners(&id).await?;
    Ok(ApiResponse::ok(winners))
}

/// Resolved winners only.
async fn official_winners(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<OfficialWinners>> {
    let winners = state.results_service.official_winners(&id).await?;
    Ok(ApiResponse::ok(winners))
}

/// Results of every ended cycle.
async fn winners_history(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<HistoryEntry>>> {
    let history = state.results_service.history().await?;
    Ok(ApiResponse::ok(history))
}

/// Break a tie at one location.
async fn announce_winner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AnnounceWinnerRequest>,
) -> AppResult<ApiResponse<AnnouncedWinner>> {
    input.validate()?;
    let announced = state
        .results_service
        .announce(&id, input.location_id.trim(), input.nominee_id.trim())
        .await?;
    Ok(ApiResponse::ok(announced))
}

// ==================== Ballots ====================

/// Check whether an employee may vote.
async fn check_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CheckEmployeeInput>,
) -> AppResult<ApiResponse<Eligibility>> {
    let eligibility = state.ballot_service.check_employee(&id, input).await?;
    Ok(ApiResponse::ok(eligibility))
}

/// Cast a ballot by employee code.
async fn cast_ballot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CastBallotInput>,
) -> AppResult<ApiResponse<CastReceipt>> {
    let receipt = state.ballot_service.cast(&id, input).await?;
    Ok(ApiResponse::created(receipt))
}

// ==================== Invites ====================

/// Email voting links.
async fn send_invites(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SendInvitesInput>,
) -> AppResult<ApiResponse<InviteReport>> {
    let report = state.invite_service.send_invites(&id, input).await?;
    Ok(ApiResponse::ok(report))
}

/// Validate a voting link without consuming it.
async fn invite_details(
    State(state): State<AppState>,
    Path((id, token)): Path<(String, String)>,
) -> AppResult<ApiResponse<Eligibility>> {
    let eligibility = state.invite_service.invite_details(&id, &token).await?;
    Ok(ApiResponse::ok(eligibility))
}

/// Cast a ballot through a voting link.
async fn cast_invited_ballot(
    State(state): State<AppState>,
    Path((id, token)): Path<(String, String)>,
    Json(input): Json<InviteCastInput>,
) -> AppResult<ApiResponse<CastReceipt>> {
    let receipt = state.invite_service.cast(&id, &token, input).await?;
    Ok(ApiResponse::created(receipt))
}

// ==================== Notifications ====================

/// Email the results summary to every participant.
async fn notify_winners(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<NotificationReport>> {
    let report = state.notification_service.notify_winners(&id).await?;
    Ok(ApiResponse::ok(report))
}

/// Email one location's result to its participants.
async fn notify_location_winner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NotifyLocationInput>,
) -> AppResult<ApiResponse<NotificationReport>> {
    let report = state
        .notification_service
        .notify_location_winner(&id, input)
        .await?;
    Ok(ApiResponse::ok(report))
}
