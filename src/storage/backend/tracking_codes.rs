//! TrackingCodeStore implementation for SeaOrmStorage
//!
//! Writes run in one short transaction whose first statement is the
//! registry claim, so concurrent writers serialize on the claim row and
//! the loser observes a conflict instead of overwriting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, TransactionTrait, sea_query::Expr,
    sea_query::OnConflict,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{model_to_tracking_code, tracking_code_to_active_model};
use super::operations::{claim_code, is_not_inserted, release_code, storage_error};
use crate::errors::Result;
use crate::storage::models::{CodeKind, CodeState, TrackingCodeRecord, WriteOutcome};
use crate::storage::traits::TrackingCodeStore;

use migration::entities::tracking_code;

#[async_trait]
impl TrackingCodeStore for SeaOrmStorage {
    async fn get_tracking_code(&self, profile_id: &str) -> Result<Option<TrackingCodeRecord>> {
        let model = tracking_code::Entity::find_by_id(profile_id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("get_tracking_code({})", profile_id), e))?;

        model.map(model_to_tracking_code).transpose()
    }

    async fn insert_tracking_code(&self, record: &TrackingCodeRecord) -> Result<WriteOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", e))?;

        if !claim_code(&txn, &record.code, CodeKind::Tracking, &record.profile_id).await? {
            txn.rollback()
                .await
                .map_err(|e| storage_error("rollback", e))?;
            debug!("Tracking code '{}' already claimed", record.code);
            return Ok(WriteOutcome::Conflict);
        }

        let result = tracking_code::Entity::insert(tracking_code_to_active_model(record))
            .on_conflict(
                OnConflict::column(tracking_code::Column::ProfileId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&txn)
            .await;

        match result {
            Ok(_) => {}
            Err(e) if is_not_inserted(&e) => {
                // 该 profile 已持有 code，撤销刚才的认领
                txn.rollback()
                    .await
                    .map_err(|e| storage_error("rollback", e))?;
                return Ok(WriteOutcome::Unchanged);
            }
            Err(e) => {
                return Err(storage_error(
                    &format!("insert_tracking_code({})", record.profile_id),
                    e,
                ));
            }
        }

        txn.commit()
            .await
            .map_err(|e| storage_error("commit", e))?;

        info!(
            "Tracking code '{}' assigned to profile {}",
            record.code, record.profile_id
        );
        Ok(WriteOutcome::Applied)
    }

    async fn customize_tracking_code(
        &self,
        profile_id: &str,
        current_code: &str,
        new_code: &str,
        qr_url: Option<String>,
        changed_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", e))?;

        let swapping = new_code != current_code;
        if swapping && !claim_code(&txn, new_code, CodeKind::Tracking, profile_id).await? {
            txn.rollback()
                .await
                .map_err(|e| storage_error("rollback", e))?;
            return Ok(WriteOutcome::Conflict);
        }

        let updated = tracking_code::Entity::update_many()
            .col_expr(tracking_code::Column::Code, Expr::value(new_code))
            .col_expr(tracking_code::Column::State, Expr::value(CodeState::CUSTOM))
            .col_expr(tracking_code::Column::ChangedAt, Expr::value(changed_at))
            .col_expr(tracking_code::Column::QrUrl, Expr::value(qr_url))
            .filter(tracking_code::Column::ProfileId.eq(profile_id))
            .filter(tracking_code::Column::Code.eq(current_code))
            .filter(tracking_code::Column::State.eq(CodeState::GENERATED))
            .exec(&txn)
            .await
            .map_err(|e| storage_error(&format!("customize_tracking_code({})", profile_id), e))?;

        if updated.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| storage_error("rollback", e))?;
            return Ok(WriteOutcome::Unchanged);
        }

        if swapping {
            release_code(&txn, current_code, CodeKind::Tracking, profile_id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| storage_error("commit", e))?;

        info!(
            "Tracking code for profile {} customized: '{}' -> '{}'",
            profile_id, current_code, new_code
        );
        Ok(WriteOutcome::Applied)
    }

    async fn finalize_tracking_code(&self, profile_id: &str) -> Result<WriteOutcome> {
        let updated = tracking_code::Entity::update_many()
            .col_expr(
                tracking_code::Column::State,
                Expr::value(CodeState::FINALIZED),
            )
            .filter(tracking_code::Column::ProfileId.eq(profile_id))
            .filter(tracking_code::Column::State.ne(CodeState::FINALIZED))
            .exec(&self.db)
            .await
            .map_err(|e| storage_error(&format!("finalize_tracking_code({})", profile_id), e))?;

        if updated.rows_affected == 0 {
            return Ok(WriteOutcome::Unchanged);
        }

        info!("Tracking code for profile {} finalized", profile_id);
        Ok(WriteOutcome::Applied)
    }
}
