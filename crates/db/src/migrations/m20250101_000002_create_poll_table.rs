//! Create poll table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Poll::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Poll::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Poll::Question).string_len(512).not_null())
                    .col(ColumnDef::new(Poll::Description).text())
                    .col(ColumnDef::new(Poll::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Poll::Options).json_binary().not_null())
                    .col(ColumnDef::new(Poll::Code).string_len(8).not_null())
                    .col(
                        ColumnDef::new(Poll::IsLive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Poll::CreatedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Poll::TotalResponses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Poll::OptionCounts).json_binary().not_null())
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Poll::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_created_by")
                            .from(Poll::Table, Poll::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: join code (audience-facing identifier)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_code")
                    .table(Poll::Table)
                    .col(Poll::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: owner (dashboard listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_created_by")
                    .table(Poll::Table)
                    .col(Poll::CreatedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Title,
    Question,
    Description,
    Kind,
    Options,
    Code,
    IsLive,
    CreatedBy,
    TotalResponses,
    OptionCounts,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
