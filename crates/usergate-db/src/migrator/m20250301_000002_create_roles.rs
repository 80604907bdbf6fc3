//! Create the role catalog and seed the built-in levels

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

const SEEDED_LEVELS: [&str; 2] = ["ADMIN", "USER"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(string_len(Role::Level, 32).primary_key())
                    .col(boolean(Role::IsActive).not_null().default(true))
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Role::Table)
            .columns([Role::Level, Role::IsActive]);
        for level in SEEDED_LEVELS {
            seed.values([level.into(), true.into()])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Role::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Role {
    #[sea_orm(iden = "roles")]
    Table,
    Level,
    IsActive,
}
