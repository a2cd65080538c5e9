//! Initial migration to create the glsync database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_integrations(manager).await?;
        self.create_activity_records(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Integrations::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_integrations(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Integrations::Table)
                    .if_not_exists()
                    // Internal
                    .col(
                        ColumnDef::new(Integrations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Identity
                    .col(ColumnDef::new(Integrations::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Integrations::GitlabUserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::GitlabUsername)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Integrations::GitlabEmail).string().null())
                    // Credential (opaque encrypted blobs)
                    .col(
                        ColumnDef::new(Integrations::AccessToken)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::RefreshToken)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::TokenExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Tracked repositories
                    .col(
                        ColumnDef::new(Integrations::Repositories)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    // Capabilities
                    .col(
                        ColumnDef::new(Integrations::CanAccessRepositories)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Integrations::CanTrackCommits)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Integrations::CanManageIssues)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Integrations::CanViewAnalytics)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    // Sync bookkeeping
                    .col(
                        ColumnDef::new(Integrations::LastSyncAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::LastSuccessfulSyncAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Integrations::SyncErrors)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    // Lifecycle
                    .col(
                        ColumnDef::new(Integrations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Integrations::IsConnected)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    // Timestamps
                    .col(
                        ColumnDef::new(Integrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Integrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Exactly one integration per user
        manager
            .create_index(
                Index::create()
                    .name("idx_integrations_user")
                    .table(Integrations::Table)
                    .col(Integrations::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Scheduler scans active integrations
        manager
            .create_index(
                Index::create()
                    .name("idx_integrations_active")
                    .table(Integrations::Table)
                    .col(Integrations::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_activity_records(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActivityRecords::Table)
                    .if_not_exists()
                    // Internal
                    .col(
                        ColumnDef::new(ActivityRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Identity
                    .col(ColumnDef::new(ActivityRecords::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ActivityRecords::ExternalId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityRecords::Kind).string().not_null())
                    // Project context
                    .col(
                        ColumnDef::new(ActivityRecords::ProjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::ProjectName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::ProjectPath)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(ActivityRecords::ProjectUrl).string().null())
                    // Content
                    .col(ColumnDef::new(ActivityRecords::Title).string().not_null())
                    .col(ColumnDef::new(ActivityRecords::Description).text().null())
                    .col(ColumnDef::new(ActivityRecords::Url).string().null())
                    .col(
                        ColumnDef::new(ActivityRecords::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::ActivityUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Kind-specific metadata
                    .col(
                        ColumnDef::new(ActivityRecords::Metadata)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    // Derived
                    .col(
                        ColumnDef::new(ActivityRecords::Impact)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::Complexity)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    // Tracking
                    .col(
                        ColumnDef::new(ActivityRecords::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ActivityRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key: re-sync updates, never duplicates
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_external_id_kind")
                    .table(ActivityRecords::Table)
                    .col(ActivityRecords::ExternalId)
                    .col(ActivityRecords::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Analytics read paths filter by user and window
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_user_occurred")
                    .table(ActivityRecords::Table)
                    .col(ActivityRecords::UserId)
                    .col(ActivityRecords::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_user_kind")
                    .table(ActivityRecords::Table)
                    .col(ActivityRecords::UserId)
                    .col(ActivityRecords::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_project")
                    .table(ActivityRecords::Table)
                    .col(ActivityRecords::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "integrations")]
enum Integrations {
    Table,
    Id,
    UserId,
    GitlabUserId,
    GitlabUsername,
    GitlabEmail,
    AccessToken,
    RefreshToken,
    TokenExpiresAt,
    Repositories,
    CanAccessRepositories,
    CanTrackCommits,
    CanManageIssues,
    CanViewAnalytics,
    LastSyncAt,
    LastSuccessfulSyncAt,
    SyncErrors,
    IsActive,
    IsConnected,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "activity_records")]
enum ActivityRecords {
    Table,
    Id,
    UserId,
    ExternalId,
    Kind,
    ProjectId,
    ProjectName,
    ProjectPath,
    ProjectUrl,
    Title,
    Description,
    Url,
    OccurredAt,
    ActivityUpdatedAt,
    Metadata,
    Impact,
    Complexity,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
