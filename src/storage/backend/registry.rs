use async_trait::async_trait;
use sea_orm::EntityTrait;

use super::SeaOrmStorage;
use super::converters::model_to_claim;
use super::operations::storage_error;
use crate::errors::Result;
use crate::storage::models::CodeClaim;
use crate::storage::traits::CodeRegistry;

use migration::entities::code_registry;

#[async_trait]
impl CodeRegistry for SeaOrmStorage {
    async fn lookup_code(&self, code: &str) -> Result<Option<CodeClaim>> {
        let model = code_registry::Entity::find_by_id(code.to_string())
            .one(&self.db)
            .await
            .map_err(|e| storage_error(&format!("lookup_code({})", code), e))?;

        model.map(model_to_claim).transpose()
    }
}
