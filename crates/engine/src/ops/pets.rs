use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Account, EngineError, LedgerCategory, LedgerEntry, Pet, ResultEngine, accounts, pets,
    progression::{self, Progression},
    util::{normalize_optional_text, normalize_owner_id, normalize_required_name},
};

use super::{Engine, LockScope};

/// A freshly registered owner and their first pet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub account: Account,
    pub pet: Pet,
}

/// Experience applied to a pet, with the level-up credit if any.
#[derive(Clone, Debug)]
pub(super) struct ExperienceApplied {
    pub(super) pet: Pet,
    pub(super) progression: Progression,
    pub(super) bonus_entry: Option<LedgerEntry>,
}

impl Engine {
    /// Create the account of `owner_id` with a zero balance and its first,
    /// active pet.
    pub async fn register_owner(
        &self,
        owner_id: &str,
        pet_name: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Registration> {
        let owner_id = normalize_owner_id(owner_id)?;
        let pet_name = normalize_required_name(pet_name, "pet")?;

        let registration = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    if engine.find_account(db_tx, &owner_id).await?.is_some() {
                        return Err(EngineError::OwnerExists(format!(
                            "'{owner_id}' is already registered"
                        )));
                    }

                    let account = Account::new(owner_id.clone(), now);
                    accounts::ActiveModel::from(&account).insert(db_tx).await?;

                    let mut pet = Pet::new(owner_id, pet_name, now);
                    pet.active = true;
                    pets::ActiveModel::from(&pet).insert(db_tx).await?;

                    Ok(Registration { account, pet })
                })
            })
            .await?;

        tracing::info!(
            owner_id = %registration.account.owner_id,
            pet_id = %registration.pet.id,
            "owner registered"
        );
        Ok(registration)
    }

    /// Add an inactive pet to an existing owner.
    pub async fn adopt_pet(
        &self,
        owner_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Pet> {
        let owner_id = normalize_owner_id(owner_id)?;
        let name = normalize_required_name(name, "pet")?;

        self.run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
            Box::pin(async move {
                engine.require_account(db_tx, &owner_id).await?;
                let pet = Pet::new(owner_id, name, now);
                pets::ActiveModel::from(&pet).insert(db_tx).await?;
                Ok(pet)
            })
        })
        .await
    }

    /// Make `pet_id` the owner's active pet and deactivate the others.
    pub async fn set_active_pet(&self, owner_id: &str, pet_id: Uuid) -> ResultEngine<Pet> {
        let owner_id = normalize_owner_id(owner_id)?;

        self.run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
            Box::pin(async move {
                engine.require_account(db_tx, &owner_id).await?;
                let mut pet = engine.require_owned_pet(db_tx, &owner_id, pet_id).await?;

                pets::Entity::update_many()
                    .col_expr(pets::Column::Active, Expr::value(false))
                    .filter(pets::Column::OwnerId.eq(owner_id.as_str()))
                    .exec(db_tx)
                    .await?;
                pets::Entity::update_many()
                    .col_expr(pets::Column::Active, Expr::value(true))
                    .filter(pets::Column::Id.eq(pet_id.to_string()))
                    .exec(db_tx)
                    .await?;

                pet.active = true;
                Ok(pet)
            })
        })
        .await
    }

    pub async fn pet(&self, owner_id: &str, pet_id: Uuid) -> ResultEngine<Pet> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;
        self.require_owned_pet(&self.database, &owner_id, pet_id)
            .await
    }

    pub async fn active_pet(&self, owner_id: &str) -> ResultEngine<Pet> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;
        self.require_active_pet(&self.database, &owner_id).await
    }

    /// All pets of an owner, oldest first.
    pub async fn pets(&self, owner_id: &str) -> ResultEngine<Vec<Pet>> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;

        pets::Entity::find()
            .filter(pets::Column::OwnerId.eq(owner_id.as_str()))
            .order_by_asc(pets::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Pet::try_from)
            .collect()
    }

    /// Change the look of a pet. Fields left as `None` keep their value.
    pub async fn change_cosmetics(
        &self,
        owner_id: &str,
        pet_id: Uuid,
        skin: Option<&str>,
        background: Option<&str>,
    ) -> ResultEngine<Pet> {
        let owner_id = normalize_owner_id(owner_id)?;
        let skin = normalize_optional_text(skin);
        let background = normalize_optional_text(background);

        self.run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
            Box::pin(async move {
                engine.require_account(db_tx, &owner_id).await?;
                let mut pet = engine.require_owned_pet(db_tx, &owner_id, pet_id).await?;
                if skin.is_none() && background.is_none() {
                    return Ok(pet);
                }

                let mut active = pets::ActiveModel {
                    id: ActiveValue::Unchanged(pet.id.to_string()),
                    ..Default::default()
                };
                if let Some(skin) = skin {
                    active.skin = ActiveValue::Set(skin.clone());
                    pet.skin = skin;
                }
                if let Some(background) = background {
                    active.background = ActiveValue::Set(background.clone());
                    pet.background = background;
                }
                active.update(db_tx).await?;
                Ok(pet)
            })
        })
        .await
    }

    /// Add `gained` experience to `pet`, persist the new level, experience
    /// and vitals, and credit the level-up bonus as a `LevelUp` entry.
    pub(super) async fn apply_experience(
        &self,
        db_tx: &DatabaseTransaction,
        mut pet: Pet,
        gained: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<ExperienceApplied> {
        let progression = progression::progress(pet.level, pet.experience, gained);
        pet.level = progression.level;
        pet.experience = progression.experience;

        pets::ActiveModel {
            id: ActiveValue::Unchanged(pet.id.to_string()),
            level: ActiveValue::Set(pet.level),
            experience: ActiveValue::Set(pet.experience),
            hunger: ActiveValue::Set(pet.vitals.hunger),
            mood: ActiveValue::Set(pet.vitals.mood),
            stamina: ActiveValue::Set(pet.vitals.stamina),
            cleanliness: ActiveValue::Set(pet.vitals.cleanliness),
            ..Default::default()
        }
        .update(db_tx)
        .await?;

        let bonus_entry = self
            .post_credit(
                db_tx,
                &pet.owner_id,
                progression.bonus_points,
                LedgerCategory::LevelUp,
                &format!("{} reached level {}", pet.name, pet.level),
                now,
            )
            .await?;

        if progression.leveled_up {
            tracing::info!(
                owner_id = %pet.owner_id,
                pet_id = %pet.id,
                level = pet.level,
                bonus = progression.bonus_points,
                "pet leveled up"
            );
        }

        Ok(ExperienceApplied {
            pet,
            progression,
            bonus_entry,
        })
    }
}
