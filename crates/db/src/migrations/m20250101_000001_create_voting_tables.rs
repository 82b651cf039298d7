//! Create location, employee, voting cycle, ballot, winner and invite tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create location table
        manager
            .create_table(
                Table::create()
                    .table(Location::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Location::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Location::Name).string_len(256).not_null().unique_key())
                    .col(ColumnDef::new(Location::Code).string_len(64).not_null().unique_key())
                    .col(
                        ColumnDef::new(Location::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create employee table
        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employee::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Employee::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Employee::LastName).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Employee::EmployeeCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Employee::Email).string_len(256).not_null().unique_key())
                    .col(ColumnDef::new(Employee::LocationIds).json().not_null())
                    .col(
                        ColumnDef::new(Employee::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create voting_cycle table
        manager
            .create_table(
                Table::create()
                    .table(VotingCycle::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VotingCycle::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(VotingCycle::Name).string_len(256).not_null())
                    .col(ColumnDef::new(VotingCycle::LocationIds).json().not_null())
                    .col(ColumnDef::new(VotingCycle::VoterIds).json().not_null())
                    .col(ColumnDef::new(VotingCycle::NomineeIds).json().not_null())
                    .col(
                        ColumnDef::new(VotingCycle::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VotingCycle::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VotingCycle::VotePoints).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(VotingCycle::MaxVotesPerVoter)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(VotingCycle::ResultsNotifiedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VotingCycle::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(VotingCycle::UpdatedAt).timestamp_with_time_zone())
                    .check(Expr::col(VotingCycle::EndAt).gt(Expr::col(VotingCycle::StartAt)))
                    .to_owned(),
            )
            .await?;

        // Index: end_at (winners history)
        manager
            .create_index(
                Index::create()
                    .name("idx_voting_cycle_end_at")
                    .table(VotingCycle::Table)
                    .col(VotingCycle::EndAt)
                    .to_owned(),
            )
            .await?;

        // Create ballot table
        manager
            .create_table(
                Table::create()
                    .table(Ballot::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ballot::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Ballot::CycleId).string_len(32).not_null())
                    .col(ColumnDef::new(Ballot::VoterId).string_len(32).not_null())
                    .col(ColumnDef::new(Ballot::NomineeIds).json().not_null())
                    .col(
                        ColumnDef::new(Ballot::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ballot_cycle")
                            .from(Ballot::Table, Ballot::CycleId)
                            .to(VotingCycle::Table, VotingCycle::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (cycle_id, voter_id) - one ballot per voter per cycle
        manager
            .create_index(
                Index::create()
                    .name("idx_ballot_cycle_voter_unique")
                    .table(Ballot::Table)
                    .col(Ballot::CycleId)
                    .col(Ballot::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create cycle_winner table
        manager
            .create_table(
                Table::create()
                    .table(CycleWinner::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CycleWinner::CycleId).string_len(32).not_null())
                    .col(ColumnDef::new(CycleWinner::LocationId).string_len(32).not_null())
                    .col(ColumnDef::new(CycleWinner::EmployeeId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(CycleWinner::AnnouncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(CycleWinner::CycleId)
                            .col(CycleWinner::LocationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cycle_winner_cycle")
                            .from(CycleWinner::Table, CycleWinner::CycleId)
                            .to(VotingCycle::Table, VotingCycle::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create vote_invite table
        manager
            .create_table(
                Table::create()
                    .table(VoteInvite::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(VoteInvite::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(VoteInvite::CycleId).string_len(32).not_null())
                    .col(ColumnDef::new(VoteInvite::EmployeeId).string_len(32).not_null())
                    .col(ColumnDef::new(VoteInvite::Token).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(VoteInvite::Used).boolean().not_null().default(false))
                    .col(ColumnDef::new(VoteInvite::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VoteInvite::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_invite_cycle")
                            .from(VoteInvite::Table, VoteInvite::CycleId)
                            .to(VotingCycle::Table, VotingCycle::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (cycle_id, employee_id) - one invite per employee per cycle
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_invite_cycle_employee_unique")
                    .table(VoteInvite::Table)
                    .col(VoteInvite::CycleId)
                    .col(VoteInvite::EmployeeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VoteInvite::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CycleWinner::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Ballot::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(VotingCycle::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Employee::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Location::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Location {
    Table,
    Id,
    Name,
    Code,
    CreatedAt,
}

#[derive(Iden)]
enum Employee {
    Table,
    Id,
    FirstName,
    LastName,
    EmployeeCode,
    Email,
    LocationIds,
    CreatedAt,
}

#[derive(Iden)]
enum VotingCycle {
    Table,
    Id,
    Name,
    LocationIds,
    VoterIds,
    NomineeIds,
    StartAt,
    EndAt,
    VotePoints,
    MaxVotesPerVoter,
    ResultsNotifiedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Ballot {
    Table,
    Id,
    CycleId,
    VoterId,
    NomineeIds,
    CreatedAt,
}

#[derive(Iden)]
enum CycleWinner {
    Table,
    CycleId,
    LocationId,
    EmployeeId,
    AnnouncedAt,
}

#[derive(Iden)]
enum VoteInvite {
    Table,
    Id,
    CycleId,
    EmployeeId,
    Token,
    Used,
    UsedAt,
    CreatedAt,
}
