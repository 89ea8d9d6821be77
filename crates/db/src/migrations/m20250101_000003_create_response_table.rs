//! Create response table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Response::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Response::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Response::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Response::OptionIndex).integer())
                    .col(ColumnDef::new(Response::Text).text())
                    .col(ColumnDef::new(Response::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Response::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Response::AudienceId).string_len(64))
                    .col(ColumnDef::new(Response::IpHash).string_len(64))
                    .col(ColumnDef::new(Response::UserAgent).string_len(200))
                    .col(
                        ColumnDef::new(Response::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Response::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_poll")
                            .from(Response::Table, Response::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one response per (poll, email). This constraint is
        // what makes the ingestion upsert race-safe under concurrent
        // first-time submissions from the same respondent.
        manager
            .create_index(
                Index::create()
                    .name("idx_response_poll_email")
                    .table(Response::Table)
                    .col(Response::PollId)
                    .col(Response::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (poll, option_index) speeds up mcq recounts
        manager
            .create_index(
                Index::create()
                    .name("idx_response_poll_option")
                    .table(Response::Table)
                    .col(Response::PollId)
                    .col(Response::OptionIndex)
                    .to_owned(),
            )
            .await?;

        // Index: email (cross-poll badge totals)
        manager
            .create_index(
                Index::create()
                    .name("idx_response_email")
                    .table(Response::Table)
                    .col(Response::Email)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (newest-first listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_response_created_at")
                    .table(Response::Table)
                    .col(Response::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Response::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Response {
    Table,
    Id,
    PollId,
    Kind,
    OptionIndex,
    Text,
    Name,
    Email,
    AudienceId,
    IpHash,
    UserAgent,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
