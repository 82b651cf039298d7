//! Personal voting links sent by email.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use voting_common::{AppError, AppResult, IdGenerator};
use voting_db::{
    entities::{employee, vote_invite, voting_cycle},
    repositories::{EmployeeRepository, VoteInviteRepository, VotingCycleRepository},
};

use crate::services::ballot::{BallotService, CastReceipt, Eligibility};
use crate::services::email::{EmailMessage, SharedMailer, escape_html, wrap_html};
use crate::services::snapshot::in_order;
use crate::tally::{CyclePhase, normalize_ids};

/// Nominees listed by name in an invite email before "and N others".
const NOMINEE_PREVIEW: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendMode {
    #[default]
    All,
    Selected,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvitesInput {
    #[serde(default)]
    pub send_mode: SendMode,
    #[serde(default)]
    pub selected_employee_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCastInput {
    #[serde(default)]
    pub nominee_ids: Vec<String>,
}

/// One recipient the mail could not be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailure {
    pub employee_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub reason: String,
}

/// Outcome of a batch of emails.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliveries {
    pub success_count: u64,
    pub failure_count: u64,
    pub errors: Vec<DeliveryFailure>,
}

impl Deliveries {
    pub fn succeeded(&mut self) {
        self.success_count += 1;
    }

    pub fn failed(&mut self, recipient: &employee::Model, email: Option<&str>, reason: String) {
        self.failure_count += 1;
        self.errors.push(DeliveryFailure {
            employee_code: recipient.employee_code.clone(),
            email: email.map(ToString::to_string),
            reason,
        });
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteReport {
    pub total_voters: u64,
    #[serde(flatten)]
    pub deliveries: Deliveries,
}

/// Invite service.
#[derive(Clone)]
pub struct InviteService {
    cycle_repo: VotingCycleRepository,
    employee_repo: EmployeeRepository,
    invite_repo: VoteInviteRepository,
    ballots: BallotService,
    mailer: SharedMailer,
    client_url: String,
    id_gen: IdGenerator,
}

impl InviteService {
    #[must_use]
    pub fn new(
        cycle_repo: VotingCycleRepository,
        employee_repo: EmployeeRepository,
        invite_repo: VoteInviteRepository,
        ballots: BallotService,
        mailer: SharedMailer,
        client_url: &str,
    ) -> Self {
        Self {
            cycle_repo,
            employee_repo,
            invite_repo,
            ballots,
            mailer,
            client_url: client_url.trim_end_matches('/').to_string(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Issue a fresh link to every targeted voter and email it.
    ///
    /// Re-sending replaces the previous token of the voter.
    pub async fn send_invites(
        &self,
        cycle_id: &str,
        input: SendInvitesInput,
    ) -> AppResult<InviteReport> {
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        let now = Utc::now().fixed_offset();
        if CyclePhase::at(cycle.start_at, cycle.end_at, now).has_ended() {
            return Err(AppError::BadRequest(
                "Cannot send invites because voting has already ended".to_string(),
            ));
        }

        let voter_ids = cycle.voter_ids()?;
        let targets = match input.send_mode {
            SendMode::All => voter_ids,
            SendMode::Selected => {
                let selected = normalize_ids(&input.selected_employee_ids);
                if selected.is_empty() {
                    return Err(AppError::BadRequest(
                        "No employees selected for invite".to_string(),
                    ));
                }
                let targets: Vec<String> =
                    voter_ids.into_iter().filter(|id| selected.contains(id)).collect();
                if targets.is_empty() {
                    return Err(AppError::BadRequest(
                        "Selected employees are not voters in this vote".to_string(),
                    ));
                }
                targets
            }
        };

        let voters = self.employee_repo.find_by_ids(&targets).await?;
        let nominee_ids = cycle.nominee_ids()?;
        let nominees = in_order(
            &nominee_ids,
            self.employee_repo.find_by_ids(&nominee_ids).await?,
            |e| e.id.as_str(),
        );
        let preview = nominee_preview(&nominees);

        let mut deliveries = Deliveries::default();
        for voter in &voters {
            let email = voter.email.trim();
            if email.is_empty() {
                deliveries.failed(voter, None, "Missing email address".to_string());
                continue;
            }

            let token = self.id_gen.generate_invite_token();
            let invite = self
                .invite_repo
                .upsert_for_employee(&self.id_gen.generate(), &cycle.id, &voter.id, &token, now)
                .await?;

            let link = format!("{}/vote/{}/invite/{}", self.client_url, cycle.id, invite.token);
            let message = EmailMessage {
                to: email.to_string(),
                subject: format!("Voting invite: {}", cycle.name),
                html_body: invite_html(&cycle, voter, &preview, &link),
            };

            match self.mailer.send(message).await {
                Ok(()) => {
                    tracing::info!(cycle_id = %cycle.id, employee_code = %voter.employee_code, "Invite sent");
                    deliveries.succeeded();
                }
                Err(e) => {
                    tracing::warn!(cycle_id = %cycle.id, employee_code = %voter.employee_code, error = %e, "Invite failed");
                    deliveries.failed(voter, Some(email), e.to_string());
                }
            }
        }

        Ok(InviteReport {
            total_voters: voters.len() as u64,
            deliveries,
        })
    }

    /// Check an invite link and the invited voter's eligibility.
    ///
    /// The link is not consumed, unless the voter has already voted.
    pub async fn invite_details(&self, cycle_id: &str, token: &str) -> AppResult<Eligibility> {
        let (cycle, invite, voter) = self.open(cycle_id, token).await?;
        self.check_invited(&cycle, &invite, &voter).await?;
        self.ballots.eligibility(&cycle, &voter).await
    }

    /// Cast the invited voter's ballot and consume the link.
    pub async fn cast(
        &self,
        cycle_id: &str,
        token: &str,
        input: InviteCastInput,
    ) -> AppResult<CastReceipt> {
        let (cycle, invite, voter) = self.open(cycle_id, token).await?;
        self.check_invited(&cycle, &invite, &voter).await?;

        let receipt = match self.ballots.cast_for(&cycle, &voter, &input.nominee_ids).await {
            Err(AppError::Conflict(msg)) => {
                self.consume(&invite).await?;
                return Err(AppError::Conflict(msg));
            }
            other => other?,
        };

        self.consume(&invite).await?;
        Ok(receipt)
    }

    async fn open(
        &self,
        cycle_id: &str,
        token: &str,
    ) -> AppResult<(voting_cycle::Model, vote_invite::Model, employee::Model)> {
        let invalid = || AppError::NotFound("Invalid or expired voting link".to_string());

        let invite = self
            .invite_repo
            .find_by_token(cycle_id, token)
            .await?
            .ok_or_else(invalid)?;
        let cycle = self.cycle_repo.get_by_id(cycle_id).await?;
        let voter = self
            .employee_repo
            .find_by_id(&invite.employee_id)
            .await?
            .ok_or_else(invalid)?;

        Ok((cycle, invite, voter))
    }

    async fn check_invited(
        &self,
        cycle: &voting_cycle::Model,
        invite: &vote_invite::Model,
        voter: &employee::Model,
    ) -> AppResult<()> {
        match self.ballots.check_eligible(cycle, voter).await {
            Err(AppError::Conflict(msg)) => {
                self.consume(invite).await?;
                Err(AppError::Conflict(msg))
            }
            other => other,
        }
    }

    async fn consume(&self, invite: &vote_invite::Model) -> AppResult<()> {
        if invite.used {
            return Ok(());
        }
        self.invite_repo
            .mark_used(&invite.id, Utc::now().fixed_offset())
            .await
    }
}

/// The first few nominee names, and how many were left out.
fn nominee_preview(nominees: &[employee::Model]) -> (Vec<String>, usize) {
    let names = nominees
        .iter()
        .take(NOMINEE_PREVIEW)
        .map(|n| format!("{} ({})", n.full_name(), n.employee_code))
        .collect();
    (names, nominees.len().saturating_sub(NOMINEE_PREVIEW))
}

fn invite_html(
    cycle: &voting_cycle::Model,
    voter: &employee::Model,
    (names, remaining): &(Vec<String>, usize),
    link: &str,
) -> String {
    let mut content = format!(
        "<p>Hi <strong>{}</strong>,</p>\
         <p>You have been invited to vote in <strong>{}</strong>.</p>",
        escape_html(&voter.full_name()),
        escape_html(&cycle.name),
    );

    if !names.is_empty() {
        content.push_str("<p><strong>Nominees for this cycle</strong></p><ul>");
        for name in names {
            content.push_str(&format!("<li>{}</li>", escape_html(name)));
        }
        if *remaining > 0 {
            content.push_str(&format!("<li>and {remaining} others</li>"));
        }
        content.push_str("</ul>");
    }

    content.push_str(&format!(
        "<p>Voting closes on {}.</p>\
         <p>Please use the link below to cast your vote. It is unique to you and can be used <strong>only once</strong>.</p>\
         <p><a href=\"{link}\" style=\"display:inline-block;padding:10px 20px;background:#6366f1;color:#fff;text-decoration:none;border-radius:999px;\">Open voting page</a></p>\
         <p>Or copy and paste this link into your browser:<br>{link}</p>\
         <p><small>If you did not expect this email, you can safely ignore it.</small></p>",
        cycle.end_at.format("%Y-%m-%d %H:%M (UTC%:z)"),
    ));

    wrap_html(&format!("Voting invite: {}", cycle.name), &content)
}
