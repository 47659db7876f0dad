//! Profile and lead tables standing in for the application's own records.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{lead_to_active_model, model_to_lead, model_to_profile};
use super::operations::{is_unique_violation, storage_error};
use crate::errors::{Result, TrackerError};
use crate::storage::models::{LeadRecord, Profile};
use crate::storage::traits::{LeadDirectory, ProfileDirectory};

use migration::entities::{lead, profile};

#[async_trait]
impl ProfileDirectory for SeaOrmStorage {
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        let model = profile::Entity::find_by_id(profile_id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("get_profile({})", profile_id), e))?;

        model.map(model_to_profile).transpose()
    }

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let model = profile::Entity::find()
            .filter(profile::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("find_profile_by_username({})", username), e))?;

        model.map(model_to_profile).transpose()
    }

    async fn upsert_profile(&self, p: &Profile) -> Result<()> {
        let model = profile::ActiveModel {
            id: Set(p.id.clone()),
            role: Set(p.role.as_ref().to_string()),
            display_name: Set(p.display_name.clone()),
            username: Set(p.username.clone()),
            created_at: Set(Utc::now()),
        };

        profile::Entity::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::Id)
                    .update_columns([
                        profile::Column::Role,
                        profile::Column::DisplayName,
                        profile::Column::Username,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| storage_error(&format!("upsert_profile({})", p.id), e))?;

        debug!("Profile {} upserted", p.id);
        Ok(())
    }
}

#[async_trait]
impl LeadDirectory for SeaOrmStorage {
    async fn find_lead_by_email(&self, email: &str) -> Result<Option<LeadRecord>> {
        let model = lead::Entity::find()
            .filter(lead::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| storage_error("find_lead_by_email", e))?;

        model.map(model_to_lead).transpose()
    }

    /// 同一号码可能对应多条 lead，取最近更新的一条
    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<LeadRecord>> {
        let model = lead::Entity::find()
            .filter(lead::Column::Phone.eq(phone))
            .order_by_desc(lead::Column::UpdatedAt)
            .one(&self.db)
            .await
            .map_err(|e| storage_error("find_lead_by_phone", e))?;

        model.map(model_to_lead).transpose()
    }

    async fn save_lead(&self, record: &LeadRecord) -> Result<LeadRecord> {
        let active_model = lead_to_active_model(record);
        let result = if record.id.is_some() {
            active_model.update(&self.db).await
        } else {
            active_model.insert(&self.db).await
        };

        match result {
            Ok(model) => model_to_lead(model),
            Err(e) if is_unique_violation(&e) => Err(TrackerError::code_taken(
                "A lead with this contact already exists",
            )),
            Err(e) => Err(storage_error("save_lead", e)),
        }
    }
}
