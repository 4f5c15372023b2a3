use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    CatalogEntry, EngineError, Pet, ResultEngine, accounts, catalog, pets,
};

use super::Engine;

impl Engine {
    pub(super) async fn find_account<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
    ) -> ResultEngine<Option<accounts::Model>> {
        accounts::Entity::find_by_id(owner_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
    ) -> ResultEngine<accounts::Model> {
        self.find_account(db, owner_id)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(format!("no account for '{owner_id}'")))
    }

    /// Load a pet and check it belongs to `owner_id`.
    pub(super) async fn require_owned_pet<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
        pet_id: Uuid,
    ) -> ResultEngine<Pet> {
        let model = pets::Entity::find_by_id(pet_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::PetNotFound(format!("pet {pet_id} not exists")))?;
        if model.owner_id != owner_id {
            return Err(EngineError::PetNotOwned(format!(
                "pet {pet_id} does not belong to '{owner_id}'"
            )));
        }
        Pet::try_from(model)
    }

    pub(super) async fn require_active_pet<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
    ) -> ResultEngine<Pet> {
        let model = pets::Entity::find()
            .filter(pets::Column::OwnerId.eq(owner_id))
            .filter(pets::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::PetNotFound(format!("'{owner_id}' has no active pet"))
            })?;
        Pet::try_from(model)
    }

    pub(super) async fn require_catalog_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        catalog_entry_id: &str,
    ) -> ResultEngine<CatalogEntry> {
        let model = catalog::Entity::find_by_id(catalog_entry_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::CatalogEntryNotFound(format!("'{catalog_entry_id}' not exists"))
            })?;
        CatalogEntry::try_from(model)
    }
}
