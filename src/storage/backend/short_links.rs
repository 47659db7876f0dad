use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, EntityTrait, ExprTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{model_to_short_link, short_link_to_active_model};
use super::operations::{claim_code, storage_error};
use crate::errors::{Result, TrackerError};
use crate::storage::models::{CodeKind, ShortLink, WriteOutcome};
use crate::storage::traits::ShortLinkStore;

use migration::entities::short_link;

#[async_trait]
impl ShortLinkStore for SeaOrmStorage {
    async fn get_short_link(&self, code: &str) -> Result<Option<ShortLink>> {
        let model = short_link::Entity::find_by_id(code.to_string())
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("get_short_link({})", code), e))?;

        Ok(model.map(model_to_short_link))
    }

    async fn list_short_links(&self, creator_profile_id: &str) -> Result<Vec<ShortLink>> {
        let models = short_link::Entity::find()
            .filter(short_link::Column::CreatorProfileId.eq(creator_profile_id))
            .order_by_desc(short_link::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| storage_error(&format!("list_short_links({})", creator_profile_id), e))?;

        Ok(models.into_iter().map(model_to_short_link).collect())
    }

    async fn insert_short_link(&self, link: &ShortLink) -> Result<WriteOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", e))?;

        if !claim_code(&txn, &link.code, CodeKind::ShortLink, &link.creator_profile_id).await? {
            txn.rollback()
                .await
                .map_err(|e| storage_error("rollback", e))?;
            return Ok(WriteOutcome::Conflict);
        }

        short_link::Entity::insert(short_link_to_active_model(link))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| storage_error(&format!("insert_short_link({})", link.code), e))?;

        txn.commit()
            .await
            .map_err(|e| storage_error("commit", e))?;

        info!(
            "Short link '{}' created by profile {}",
            link.code, link.creator_profile_id
        );
        Ok(WriteOutcome::Applied)
    }

    async fn increment_visits(&self, code: &str, clicks: u64, unique_clicks: u64) -> Result<()> {
        let updated = short_link::Entity::update_many()
            .col_expr(
                short_link::Column::Clicks,
                Expr::col(short_link::Column::Clicks).add(clicks as i64),
            )
            .col_expr(
                short_link::Column::UniqueClicks,
                Expr::col(short_link::Column::UniqueClicks).add(unique_clicks as i64),
            )
            .filter(short_link::Column::Code.eq(code))
            .exec(&self.db)
            .await
            .map_err(|e| storage_error(&format!("increment_visits({})", code), e))?;

        if updated.rows_affected == 0 {
            return Err(TrackerError::not_found(format!(
                "Short link not found: {}",
                code
            )));
        }

        debug!(
            "Short link '{}' visits +{} (unique +{})",
            code, clicks, unique_clicks
        );
        Ok(())
    }

    async fn increment_conversions(&self, code: &str, conversions: u64) -> Result<()> {
        let updated = short_link::Entity::update_many()
            .col_expr(
                short_link::Column::Conversions,
                Expr::col(short_link::Column::Conversions).add(conversions as i64),
            )
            .filter(short_link::Column::Code.eq(code))
            .exec(&self.db)
            .await
            .map_err(|e| storage_error(&format!("increment_conversions({})", code), e))?;

        if updated.rows_affected == 0 {
            return Err(TrackerError::not_found(format!(
                "Short link not found: {}",
                code
            )));
        }

        debug!("Short link '{}' conversions +{}", code, conversions);
        Ok(())
    }

    async fn set_short_link_active(
        &self,
        creator_profile_id: &str,
        code: &str,
        active: bool,
    ) -> Result<WriteOutcome> {
        let updated = short_link::Entity::update_many()
            .col_expr(short_link::Column::IsActive, Expr::value(active))
            .filter(short_link::Column::Code.eq(code))
            .filter(short_link::Column::CreatorProfileId.eq(creator_profile_id))
            .exec(&self.db)
            .await
            .map_err(|e| storage_error(&format!("set_short_link_active({})", code), e))?;

        if updated.rows_affected == 0 {
            return Ok(WriteOutcome::Unchanged);
        }

        info!("Short link '{}' active = {}", code, active);
        Ok(WriteOutcome::Applied)
    }
}
