use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create subscription_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(SubscriptionStatus::Type)
                    .values([SubscriptionStatus::Active, SubscriptionStatus::Inactive])
                    .to_owned(),
            )
            .await?;

        // Create commitment_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(CommitmentStatus::Type)
                    .values([
                        CommitmentStatus::InProgress,
                        CommitmentStatus::Completed,
                        CommitmentStatus::Defaulted,
                        CommitmentStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        // Create users table (FIRST - other tables reference this)
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string_null(Users::Email).unique_key())
                    .col(
                        ColumnDef::new(Users::SubscriptionStatus)
                            .custom(SubscriptionStatus::Type)
                            .not_null()
                            .default(SimpleExpr::Custom(
                                "'inactive'::subscription_status".to_string(),
                            )),
                    )
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create trigger function for updated_at
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;
                "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER update_users_updated_at
                BEFORE UPDATE ON users
                FOR EACH ROW
                EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        // Create books table
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(pk_uuid(Books::Id))
                    .col(string_null(Books::ExternalId).unique_key())
                    .col(string(Books::Title).not_null())
                    .col(string(Books::Author).not_null())
                    .col(string_null(Books::CoverUrl))
                    .col(integer_null(Books::TotalPages))
                    .col(
                        timestamp_with_time_zone(Books::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create commitments table
        manager
            .create_table(
                Table::create()
                    .table(Commitments::Table)
                    .if_not_exists()
                    .col(pk_uuid(Commitments::Id))
                    .col(uuid(Commitments::UserId).not_null())
                    .col(uuid(Commitments::BookId).not_null())
                    .col(timestamp_with_time_zone(Commitments::Deadline).not_null())
                    .col(integer(Commitments::PledgeAmount).not_null())
                    .col(string_len(Commitments::Currency, 3).not_null())
                    .col(integer(Commitments::TargetPages).not_null())
                    .col(
                        ColumnDef::new(Commitments::Status)
                            .custom(CommitmentStatus::Type)
                            .not_null()
                            .default(SimpleExpr::Custom(
                                "'in_progress'::commitment_status".to_string(),
                            )),
                    )
                    .col(
                        timestamp_with_time_zone(Commitments::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Commitments::UpdatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commitments_user_id")
                            .from(Commitments::Table, Commitments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commitments_book_id")
                            .from(Commitments::Table, Commitments::BookId)
                            .to(Books::Table, Books::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER update_commitments_updated_at
                BEFORE UPDATE ON commitments
                FOR EACH ROW
                EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commitments_user_id")
                    .table(Commitments::Table)
                    .col(Commitments::UserId)
                    .to_owned(),
            )
            .await?;

        // Create iap_transactions table (one row per verified store transaction)
        manager
            .create_table(
                Table::create()
                    .table(IapTransactions::Table)
                    .if_not_exists()
                    .col(pk_uuid(IapTransactions::Id))
                    .col(uuid(IapTransactions::UserId).not_null())
                    .col(string(IapTransactions::TransactionId).not_null())
                    .col(string_null(IapTransactions::OriginalTransactionId))
                    .col(string(IapTransactions::ProductId).not_null())
                    .col(string(IapTransactions::Platform).not_null())
                    .col(timestamp_with_time_zone_null(IapTransactions::ExpiresAt))
                    .col(
                        timestamp_with_time_zone(IapTransactions::VerifiedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_iap_transactions_user_id")
                            .from(IapTransactions::Table, IapTransactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique transaction id keeps receipt verification idempotent
        manager
            .create_index(
                Index::create()
                    .name("idx_iap_transactions_transaction_id")
                    .table(IapTransactions::Table)
                    .col(IapTransactions::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_iap_transactions_user_id")
                    .table(IapTransactions::Table)
                    .col(IapTransactions::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IapTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commitments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS update_updated_at_column();")
            .await?;

        manager
            .drop_type(Type::drop().name(CommitmentStatus::Type).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(SubscriptionStatus::Type).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    SubscriptionStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Books {
    Table,
    Id,
    ExternalId,
    Title,
    Author,
    CoverUrl,
    TotalPages,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Commitments {
    Table,
    Id,
    UserId,
    BookId,
    Deadline,
    PledgeAmount,
    Currency,
    TargetPages,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum IapTransactions {
    Table,
    Id,
    UserId,
    TransactionId,
    OriginalTransactionId,
    ProductId,
    Platform,
    ExpiresAt,
    VerifiedAt,
}

#[derive(DeriveIden)]
enum SubscriptionStatus {
    #[sea_orm(iden = "subscription_status")]
    Type,
    Active,
    Inactive,
}

#[derive(DeriveIden)]
enum CommitmentStatus {
    #[sea_orm(iden = "commitment_status")]
    Type,
    InProgress,
    Completed,
    Defaulted,
    Cancelled,
}
