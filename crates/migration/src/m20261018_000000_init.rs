//! Initial schema for PetPoints.
//!
//! - `accounts`: point balance per owner
//! - `ledger_entries`: append-only audit trail of balance changes
//! - `pets`: pets with level, experience, vitals and cosmetics
//! - `sign_ins`: one row per owner and calendar day
//! - `game_sessions`: mini-game rounds, counted for the daily cap
//! - `catalog_entries`: redeemable rewards, plus the seeded `bonus-coupon`
//! - `issued_rewards`: coupons and e-vouchers held by owners

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

pub(crate) const BONUS_COUPON_ID: &str = "bonus-coupon";

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    OwnerId,
    Balance,
    CreatedAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    OwnerId,
    Seq,
    Delta,
    Category,
    ReferenceCode,
    Reason,
    BalanceAfter,
    CreatedAt,
}

#[derive(Iden)]
enum Pets {
    Table,
    Id,
    OwnerId,
    Name,
    Level,
    Experience,
    Hunger,
    Mood,
    Stamina,
    Cleanliness,
    Skin,
    Background,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum SignIns {
    Table,
    Id,
    OwnerId,
    Day,
    SignedAt,
    Points,
    Experience,
    Coupons,
    Streak,
}

#[derive(Iden)]
enum GameSessions {
    Table,
    Id,
    OwnerId,
    PetId,
    Day,
    PlayedAt,
    Difficulty,
    Outcome,
    MonstersDefeated,
    Points,
    Experience,
    Coupons,
    LevelUpBonus,
}

#[derive(Iden)]
enum CatalogEntries {
    Table,
    Id,
    Kind,
    Name,
    Cost,
    ValidFrom,
    ValidUntil,
    Stock,
}

#[derive(Iden)]
enum IssuedRewards {
    Table,
    Id,
    OwnerId,
    CatalogEntryId,
    Kind,
    Code,
    Origin,
    IssuedAt,
    Used,
    UsedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::OwnerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Balance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Accounts::Balance).gte(0)),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Ledger entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::OwnerId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Seq).big_integer().not_null())
                    .col(ColumnDef::new(LedgerEntries::Delta).big_integer().not_null())
                    .col(ColumnDef::new(LedgerEntries::Category).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::ReferenceCode).string())
                    .col(ColumnDef::new(LedgerEntries::Reason).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-owner_id")
                            .from(LedgerEntries::Table, LedgerEntries::OwnerId)
                            .to(Accounts::Table, Accounts::OwnerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-owner_id-seq-unique")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::OwnerId)
                    .col(LedgerEntries::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Pets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Pets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pets::OwnerId).string().not_null())
                    .col(ColumnDef::new(Pets::Name).string().not_null())
                    .col(ColumnDef::new(Pets::Level).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Pets::Experience)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Pets::Hunger).integer().not_null())
                    .col(ColumnDef::new(Pets::Mood).integer().not_null())
                    .col(ColumnDef::new(Pets::Stamina).integer().not_null())
                    .col(ColumnDef::new(Pets::Cleanliness).integer().not_null())
                    .col(ColumnDef::new(Pets::Skin).string().not_null())
                    .col(ColumnDef::new(Pets::Background).string().not_null())
                    .col(
                        ColumnDef::new(Pets::Active)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Pets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pets-owner_id")
                            .from(Pets::Table, Pets::OwnerId)
                            .to(Accounts::Table, Accounts::OwnerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-pets-owner_id")
                    .table(Pets::Table)
                    .col(Pets::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Sign-ins
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SignIns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignIns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SignIns::OwnerId).string().not_null())
                    .col(ColumnDef::new(SignIns::Day).date().not_null())
                    .col(ColumnDef::new(SignIns::SignedAt).timestamp().not_null())
                    .col(ColumnDef::new(SignIns::Points).big_integer().not_null())
                    .col(ColumnDef::new(SignIns::Experience).big_integer().not_null())
                    .col(ColumnDef::new(SignIns::Coupons).integer().not_null())
                    .col(ColumnDef::new(SignIns::Streak).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sign_ins-owner_id")
                            .from(SignIns::Table, SignIns::OwnerId)
                            .to(Accounts::Table, Accounts::OwnerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sign_ins-owner_id-day-unique")
                    .table(SignIns::Table)
                    .col(SignIns::OwnerId)
                    .col(SignIns::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Game sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GameSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameSessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameSessions::OwnerId).string().not_null())
                    .col(ColumnDef::new(GameSessions::PetId).string().not_null())
                    .col(ColumnDef::new(GameSessions::Day).date().not_null())
                    .col(
                        ColumnDef::new(GameSessions::PlayedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GameSessions::Difficulty)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameSessions::Outcome).string().not_null())
                    .col(
                        ColumnDef::new(GameSessions::MonstersDefeated)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameSessions::Points).big_integer().not_null())
                    .col(
                        ColumnDef::new(GameSessions::Experience)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GameSessions::Coupons).integer().not_null())
                    .col(
                        ColumnDef::new(GameSessions::LevelUpBonus)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-game_sessions-owner_id")
                            .from(GameSessions::Table, GameSessions::OwnerId)
                            .to(Accounts::Table, Accounts::OwnerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-game_sessions-pet_id")
                            .from(GameSessions::Table, GameSessions::PetId)
                            .to(Pets::Table, Pets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-game_sessions-owner_id-day")
                    .table(GameSessions::Table)
                    .col(GameSessions::OwnerId)
                    .col(GameSessions::Day)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Catalog entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CatalogEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogEntries::Kind).string().not_null())
                    .col(ColumnDef::new(CatalogEntries::Name).string().not_null())
                    .col(
                        ColumnDef::new(CatalogEntries::Cost)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(CatalogEntries::Cost).gte(0)),
                    )
                    .col(ColumnDef::new(CatalogEntries::ValidFrom).timestamp())
                    .col(ColumnDef::new(CatalogEntries::ValidUntil).timestamp())
                    .col(ColumnDef::new(CatalogEntries::Stock).big_integer())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Issued rewards
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(IssuedRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssuedRewards::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssuedRewards::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(IssuedRewards::CatalogEntryId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IssuedRewards::Kind).string().not_null())
                    .col(ColumnDef::new(IssuedRewards::Code).string().not_null())
                    .col(ColumnDef::new(IssuedRewards::Origin).string().not_null())
                    .col(
                        ColumnDef::new(IssuedRewards::IssuedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IssuedRewards::Used)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(IssuedRewards::UsedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issued_rewards-owner_id")
                            .from(IssuedRewards::Table, IssuedRewards::OwnerId)
                            .to(Accounts::Table, Accounts::OwnerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-issued_rewards-catalog_entry_id")
                            .from(IssuedRewards::Table, IssuedRewards::CatalogEntryId)
                            .to(CatalogEntries::Table, CatalogEntries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issued_rewards-kind-code-unique")
                    .table(IssuedRewards::Table)
                    .col(IssuedRewards::Kind)
                    .col(IssuedRewards::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-issued_rewards-owner_id")
                    .table(IssuedRewards::Table)
                    .col(IssuedRewards::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. System catalog entry for granted coupons
        // ───────────────────────────────────────────────────────────────────
        let db = manager.get_connection();
        let backend = manager.get_database_backend();
        let stmt = Query::insert()
            .into_table(CatalogEntries::Table)
            .columns([
                CatalogEntries::Id,
                CatalogEntries::Kind,
                CatalogEntries::Name,
                CatalogEntries::Cost,
                CatalogEntries::ValidFrom,
                CatalogEntries::ValidUntil,
                CatalogEntries::Stock,
            ])
            .values([
                BONUS_COUPON_ID.into(),
                "coupon".into(),
                "Bonus coupon".into(),
                0i64.into(),
                None::<String>.into(),
                None::<String>.into(),
                None::<i64>.into(),
            ])
            .map_err(|err| DbErr::Custom(err.to_string()))?
            .to_owned();
        db.execute(backend.build(&stmt)).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(IssuedRewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GameSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SignIns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
