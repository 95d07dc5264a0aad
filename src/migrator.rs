// `MigrationTrait` is defined with elided `SchemaManager` lifetimes, so the
// impls below must match it exactly and cannot satisfy this idiom lint.
#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_customers_table::Migration),
            Box::new(m20240101_000002_create_managers_table::Migration),
            Box::new(m20240101_000003_create_token_tables::Migration),
            Box::new(m20240101_000004_create_products_table::Migration),
            Box::new(m20240101_000005_create_sales_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_customers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(
                            ColumnDef::new(Customers::Phone)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Customers::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Customers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Name,
        Phone,
        PasswordHash,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_managers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_managers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Managers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Managers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Managers::Name).string().not_null())
                        .col(
                            ColumnDef::new(Managers::Phone)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Managers::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Managers::IsAdmin)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Managers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Managers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Managers {
        Table,
        Id,
        Name,
        Phone,
        PasswordHash,
        IsAdmin,
        CreatedAt,
    }
}

mod m20240101_000003_create_token_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_token_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ManagerTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ManagerTokens::Token)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ManagerTokens::ManagerId).uuid().not_null())
                        .col(
                            ColumnDef::new(ManagerTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_manager_tokens_manager")
                                .from(ManagerTokens::Table, ManagerTokens::ManagerId)
                                .to(Managers::Table, Managers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerTokens::Token)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerTokens::CustomerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_tokens_customer")
                                .from(CustomerTokens::Table, CustomerTokens::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerTokens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ManagerTokens::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ManagerTokens {
        Table,
        Token,
        ManagerId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerTokens {
        Table,
        Token,
        CustomerId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Managers {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
    }
}

mod m20240101_000004_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Price,
        Quantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_sales_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_sales_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sales::ManagerId).uuid().not_null())
                        .col(ColumnDef::new(Sales::CustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_manager_id")
                        .table(Sales::Table)
                        .col(Sales::ManagerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesPositions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesPositions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesPositions::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SalesPositions::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesPositions::Price)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesPositions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesPositions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_positions_sale")
                                .from(SalesPositions::Table, SalesPositions::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_positions_product")
                                .from(SalesPositions::Table, SalesPositions::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_sales_positions_sale_id")
                        .table(SalesPositions::Table)
                        .col(SalesPositions::SaleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesPositions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        ManagerId,
        CustomerId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum SalesPositions {
        Table,
        Id,
        SaleId,
        ProductId,
        Price,
        Quantity,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
    }
}
