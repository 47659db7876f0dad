//! Claim-if-free primitives shared by the store implementations.

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, SqlErr,
    sea_query::OnConflict,
};
use tracing::trace;

use crate::errors::{Result, TrackerError};
use crate::storage::models::CodeKind;
use migration::entities::code_registry;

/// `ON CONFLICT DO NOTHING` 未插入任何行
pub(super) fn is_not_inserted(err: &DbErr) -> bool {
    if matches!(err, DbErr::RecordNotInserted) {
        return true;
    }
    // 某些数据库后端在 do_nothing 时返回的是包装后的错误
    let err_str = err.to_string().to_lowercase();
    err_str.contains("no rows") || err_str.contains("record not inserted")
}

pub(super) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(super) fn storage_error(context: &str, err: DbErr) -> TrackerError {
    tracing::error!("{} failed: {}", context, err);
    TrackerError::storage_unavailable(format!("{} failed: {}", context, err))
}

/// 在全局命名空间中原子认领 code
///
/// 返回 `false` 表示 code 已被占用（无论被谁占用）。
pub(super) async fn claim_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
    kind: CodeKind,
    owner_profile_id: &str,
) -> Result<bool> {
    let model = code_registry::ActiveModel {
        code: Set(code.to_string()),
        kind: Set(kind.as_ref().to_string()),
        owner_profile_id: Set(owner_profile_id.to_string()),
        claimed_at: Set(Utc::now()),
    };

    let result = code_registry::Entity::insert(model)
        .on_conflict(
            OnConflict::column(code_registry::Column::Code)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

    match result {
        Ok(_) => {
            trace!("Code '{}' claimed by {}", code, owner_profile_id);
            Ok(true)
        }
        Err(e) if is_not_inserted(&e) => Ok(false),
        Err(e) => Err(storage_error(&format!("claim_code({})", code), e)),
    }
}

/// 释放 code（仅当归属与类型都匹配）
pub(super) async fn release_code<C: ConnectionTrait>(
    db: &C,
    code: &str,
    kind: CodeKind,
    owner_profile_id: &str,
) -> Result<()> {
    code_registry::Entity::delete_many()
        .filter(code_registry::Column::Code.eq(code))
        .filter(code_registry::Column::Kind.eq(kind.as_ref()))
        .filter(code_registry::Column::OwnerProfileId.eq(owner_profile_id))
        .exec(db)
        .await
        .map_err(|e| storage_error(&format!("release_code({})", code), e))?;
    Ok(())
}
