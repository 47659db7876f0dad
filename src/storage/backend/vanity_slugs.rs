use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr, sea_query::OnConflict};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_vanity_slug, vanity_slug_to_active_model};
use super::operations::{is_not_inserted, is_unique_violation, storage_error};
use crate::errors::Result;
use crate::storage::models::{VanitySlug, WriteOutcome};
use crate::storage::traits::VanitySlugStore;

use migration::entities::vanity_slug;

#[async_trait]
impl VanitySlugStore for SeaOrmStorage {
    async fn get_vanity_slug(&self, profile_id: &str) -> Result<Option<VanitySlug>> {
        let model = vanity_slug::Entity::find_by_id(profile_id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("get_vanity_slug({})", profile_id), e))?;

        Ok(model.map(model_to_vanity_slug))
    }

    async fn find_vanity_slug(&self, slug: &str) -> Result<Option<VanitySlug>> {
        let model = vanity_slug::Entity::find()
            .filter(vanity_slug::Column::SlugKey.eq(slug.to_lowercase()))
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("find_vanity_slug({})", slug), e))?;

        Ok(model.map(model_to_vanity_slug))
    }

    async fn insert_vanity_slug(&self, slug: &VanitySlug) -> Result<WriteOutcome> {
        let result = vanity_slug::Entity::insert(vanity_slug_to_active_model(slug))
            .on_conflict(
                OnConflict::column(vanity_slug::Column::SlugKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        match result {
            Ok(_) => {
                info!(
                    "Vanity slug '{}' claimed by profile {}",
                    slug.slug, slug.profile_id
                );
                Ok(WriteOutcome::Applied)
            }
            Err(e) if is_not_inserted(&e) => Ok(WriteOutcome::Conflict),
            // 主键冲突：该 profile 已有 slug
            Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::Unchanged),
            Err(e) => Err(storage_error(
                &format!("insert_vanity_slug({})", slug.slug),
                e,
            )),
        }
    }

    async fn change_vanity_slug(
        &self,
        profile_id: &str,
        new_slug: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let result = vanity_slug::Entity::update_many()
            .col_expr(vanity_slug::Column::Slug, Expr::value(new_slug))
            .col_expr(
                vanity_slug::Column::SlugKey,
                Expr::value(new_slug.to_lowercase()),
            )
            .col_expr(vanity_slug::Column::ChangedAt, Expr::value(changed_at))
            .filter(vanity_slug::Column::ProfileId.eq(profile_id))
            .filter(vanity_slug::Column::ChangedAt.is_null())
            .exec(&self.db)
            .await;

        match result {
            Ok(updated) if updated.rows_affected == 0 => Ok(WriteOutcome::Unchanged),
            Ok(_) => {
                info!(
                    "Vanity slug for profile {} changed to '{}'",
                    profile_id, new_slug
                );
                Ok(WriteOutcome::Applied)
            }
            Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::Conflict),
            Err(e) => Err(storage_error(
                &format!("change_vanity_slug({})", profile_id),
                e,
            )),
        }
    }
}
