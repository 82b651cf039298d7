//! Winner summary emails.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;
use voting_common::{AppError, AppResult};
use voting_db::{
    entities::employee,
    repositories::{EmployeeRepository, VotingCycleRepository},
};

use crate::services::email::{EmailMessage, SharedMailer, escape_html, wrap_html};
use crate::services::invite::Deliveries;
use crate::services::results::{LocationWinnerSummary, ResolvedCycle, ResultsService};
use crate::tally::{LocationRef, normalize_ids};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotifyLocationInput {
    #[validate(length(min = 1, message = "locationId is required"))]
    pub location_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRef>,
    pub total_recipients: u64,
    #[serde(flatten)]
    pub deliveries: Deliveries,
}

/// Notification service.
#[derive(Clone)]
pub struct NotificationService {
    cycle_repo: VotingCycleRepository,
    employee_repo: EmployeeRepository,
    results: ResultsService,
    mailer: SharedMailer,
}

impl NotificationService {
    #[must_use]
    pub const fn new(
        cycle_repo: VotingCycleRepository,
        employee_repo: EmployeeRepository,
        results: ResultsService,
        mailer: SharedMailer,
    ) -> Self {
        Self {
            cycle_repo,
            employee_repo,
            results,
            mailer,
        }
    }

    /// Email the summary of every location to all voters and nominees.
    pub async fn notify_winners(&self, cycle_id: &str) -> AppResult<NotificationReport> {
        let resolved = self.ended(cycle_id, "Winner summary").await?;
        let recipients = self.recipients(&resolved).await?;
        if recipients.is_empty() {
            return Err(AppError::BadRequest(
                "No employees found to notify for this vote".to_string(),
            ));
        }

        let summaries = resolved.summaries();
        let subject = format!("Vote results: {}", resolved.loaded.cycle.name);
        let deliveries = self
            .dispatch(&resolved, &summaries, &recipients, &subject)
            .await;

        if deliveries.success_count > 0 {
            self.cycle_repo
                .mark_results_notified(&resolved.loaded.cycle.id, Utc::now().fixed_offset())
                .await?;
        }

        tracing::info!(
            cycle_id = %resolved.loaded.cycle.id,
            sent = deliveries.success_count,
            failed = deliveries.failure_count,
            "Winner summary dispatched"
        );

        Ok(NotificationReport {
            location: None,
            total_recipients: recipients.len() as u64,
            deliveries,
        })
    }

    /// Email one location's summary to the voters and nominees assigned to it.
    pub async fn notify_location_winner(
        &self,
        cycle_id: &str,
        input: NotifyLocationInput,
    ) -> AppResult<NotificationReport> {
        input.validate()?;
        let location_id = input.location_id.trim();

        let resolved = self.ended(cycle_id, "Store winner notification").await?;
        let location = resolved
            .loaded
            .location(location_id)
            .cloned()
            .ok_or_else(|| AppError::Validation("Location is not part of this vote".to_string()))?;
        let summaries: Vec<LocationWinnerSummary> = resolved
            .summaries()
            .into_iter()
            .filter(|s| s.location_id == location.id)
            .collect();

        let mut recipients = Vec::new();
        for person in self.recipients(&resolved).await? {
            if person.location_ids()?.contains(&location.id) {
                recipients.push(person);
            }
        }
        if recipients.is_empty() {
            return Err(AppError::BadRequest(
                "No employees found for this store in this vote cycle".to_string(),
            ));
        }

        let subject = format!(
            "Vote results ({}): {}",
            location.code, resolved.loaded.cycle.name
        );
        let deliveries = self
            .dispatch(&resolved, &summaries, &recipients, &subject)
            .await;

        tracing::info!(
            cycle_id = %resolved.loaded.cycle.id,
            location_id = %location.id,
            sent = deliveries.success_count,
            failed = deliveries.failure_count,
            "Store winner notification dispatched"
        );

        Ok(NotificationReport {
            location: Some(location),
            total_recipients: recipients.len() as u64,
            deliveries,
        })
    }

    async fn ended(&self, cycle_id: &str, what: &str) -> AppResult<ResolvedCycle> {
        let resolved = self.results.resolve(cycle_id).await?;
        if !resolved.phase.has_ended() {
            return Err(AppError::BadRequest(format!(
                "{what} can only be sent after the voting cycle has ended"
            )));
        }
        Ok(resolved)
    }

    /// Voters and nominees of the cycle, each once.
    async fn recipients(&self, resolved: &ResolvedCycle) -> AppResult<Vec<employee::Model>> {
        let cycle = &resolved.loaded.cycle;
        let ids = normalize_ids(cycle.voter_ids()?.into_iter().chain(cycle.nominee_ids()?));
        self.employee_repo.find_by_ids(&ids).await
    }

    async fn dispatch(
        &self,
        resolved: &ResolvedCycle,
        summaries: &[LocationWinnerSummary],
        recipients: &[employee::Model],
        subject: &str,
    ) -> Deliveries {
        let mut deliveries = Deliveries::default();

        for person in recipients {
            let email = person.email.trim();
            if email.is_empty() {
                deliveries.failed(person, None, "Missing email address".to_string());
                continue;
            }

            let is_winner = summaries
                .iter()
                .filter_map(|s| s.winner.as_ref())
                .any(|w| w.standing.nominee.id == person.id);

            let message = EmailMessage {
                to: email.to_string(),
                subject: subject.to_string(),
                html_body: summary_html(&resolved.loaded.cycle.name, person, summaries, is_winner),
            };

            match self.mailer.send(message).await {
                Ok(()) => deliveries.succeeded(),
                Err(e) => {
                    tracing::warn!(employee_code = %person.employee_code, error = %e, "Winner summary failed");
                    deliveries.failed(person, Some(email), e.to_string());
                }
            }
        }

        deliveries
    }
}

/// The winner summary email body.
#[must_use]
pub fn summary_html(
    cycle_name: &str,
    recipient: &employee::Model,
    summaries: &[LocationWinnerSummary],
    is_winner: bool,
) -> String {
    let name = recipient.full_name();
    let name = if name.is_empty() { "there".to_string() } else { name };
    let mut content = format!(
        "<p>Hi <strong>{}</strong>,</p>\
         <p>The voting cycle <strong>{}</strong> has finished. Below is the winner summary for each store.</p>",
        escape_html(&name),
        escape_html(cycle_name),
    );

    if is_winner {
        content.push_str(
            "<div style=\"margin:16px 0;padding:14px;border-radius:14px;background:#ecfdf5;border:1px solid #a7f3d0;\">\
             <p><strong>Congratulations!</strong></p>\
             <p>You are listed as a winner in this cycle for at least one store.</p>\
             </div>",
        );
    }

    content.push_str("<table><tr><th>Store</th><th>Winner</th></tr>");
    for summary in summaries {
        let store = escape_html(&format!("{} ({})", summary.name, summary.code));
        let winner = match &summary.winner {
            Some(w) => format!(
                "<strong>{}</strong> ({})",
                escape_html(&format!(
                    "{} {}",
                    w.standing.nominee.first_name, w.standing.nominee.last_name
                )),
                escape_html(&w.standing.nominee.employee_code)
            ),
            None if summary.total_votes == 0 => "<em>No votes were cast</em>".to_string(),
            None => "<em>Winner not announced yet (tie / pending)</em>".to_string(),
        };
        content.push_str(&format!("<tr><td>{store}</td><td>{winner}</td></tr>"));
    }
    content.push_str("</table>");
    content.push_str(
        "<p>Thank you for taking part and supporting your team. Keep up the great work!</p>",
    );

    wrap_html(&format!("Results announced: {cycle_name}"), &content)
}
