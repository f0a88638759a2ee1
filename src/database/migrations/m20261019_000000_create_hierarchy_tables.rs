use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sites::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sites::Name).string().not_null())
                    .col(ColumnDef::new(Sites::Kind).string().not_null().default(""))
                    .col(ColumnDef::new(Sites::ParentId).integer())
                    .col(ColumnDef::new(Sites::Status).string())
                    .col(ColumnDef::new(Sites::Compliance).double())
                    .col(ColumnDef::new(Sites::Address).json())
                    .col(ColumnDef::new(Sites::GpsCoordinates).json())
                    .col(ColumnDef::new(Sites::ClientId).integer())
                    .col(ColumnDef::new(Sites::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Sites::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sites_parent")
                            .from(Sites::Table, Sites::ParentId)
                            .to(Sites::Table, Sites::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sites_parent_id")
                    .table(Sites::Table)
                    .col(Sites::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Staff::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Staff::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Staff::Name).string().not_null())
                    .col(ColumnDef::new(Staff::Kind).string().not_null().default(""))
                    .col(ColumnDef::new(Staff::SupervisorId).integer())
                    .col(ColumnDef::new(Staff::Status).string())
                    .col(ColumnDef::new(Staff::Compliance).double())
                    .col(ColumnDef::new(Staff::SiteId).integer())
                    .col(ColumnDef::new(Staff::Email).string())
                    .col(ColumnDef::new(Staff::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Staff::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_staff_supervisor")
                            .from(Staff::Table, Staff::SupervisorId)
                            .to(Staff::Table, Staff::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_staff_site")
                            .from(Staff::Table, Staff::SiteId)
                            .to(Sites::Table, Sites::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_staff_supervisor_id")
                    .table(Staff::Table)
                    .col(Staff::SupervisorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Staff::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sites::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sites {
    Table,
    Id,
    Name,
    #[sea_orm(iden = "type")]
    Kind,
    ParentId,
    Status,
    Compliance,
    Address,
    GpsCoordinates,
    ClientId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Staff {
    Table,
    Id,
    Name,
    #[sea_orm(iden = "type")]
    Kind,
    SupervisorId,
    Status,
    Compliance,
    SiteId,
    Email,
    CreatedAt,
    UpdatedAt,
}
