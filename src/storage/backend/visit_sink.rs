//! VisitSink implementation for SeaOrmStorage
//!
//! Buffered deltas are applied in one parameterized `UPDATE ... CASE`
//! statement, so each counter is only ever incremented.

use async_trait::async_trait;
use sea_orm::sea_query::{CaseStatement, Expr, Query};
use sea_orm::{ConnectionTrait, ExprTrait};
use tracing::debug;

use super::SeaOrmStorage;
use crate::analytics::{VisitDelta, VisitSink};
use crate::utils::is_valid_code;

use migration::entities::short_link;

#[async_trait]
impl VisitSink for SeaOrmStorage {
    async fn flush_visits(&self, updates: Vec<VisitDelta>) -> anyhow::Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        for delta in &updates {
            if !is_valid_code(&delta.code) {
                return Err(anyhow::anyhow!(
                    "Invalid code format detected: '{}' - refusing to execute SQL",
                    delta.code
                ));
            }
        }

        let mut clicks_case = CaseStatement::new();
        let mut unique_case = CaseStatement::new();
        let mut codes: Vec<String> = Vec::with_capacity(updates.len());

        for delta in &updates {
            clicks_case = clicks_case.case(
                Expr::col(short_link::Column::Code).eq(Expr::val(delta.code.as_str())),
                Expr::col(short_link::Column::Clicks).add(Expr::val(delta.clicks as i64)),
            );
            unique_case = unique_case.case(
                Expr::col(short_link::Column::Code).eq(Expr::val(delta.code.as_str())),
                Expr::col(short_link::Column::UniqueClicks)
                    .add(Expr::val(delta.unique_clicks as i64)),
            );
            codes.push(delta.code.clone());
        }
        clicks_case = clicks_case.finally(Expr::col(short_link::Column::Clicks));
        unique_case = unique_case.finally(Expr::col(short_link::Column::UniqueClicks));

        let stmt = Query::update()
            .table(short_link::Entity)
            .value(short_link::Column::Clicks, clicks_case)
            .value(short_link::Column::UniqueClicks, unique_case)
            .and_where(Expr::col(short_link::Column::Code).is_in(codes))
            .to_owned();

        self.db
            .execute(&stmt)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to batch update visit counts: {}", e))?;

        debug!(
            "Visit counts flushed to {} database ({} records)",
            self.backend_name.to_uppercase(),
            updates.len()
        );
        Ok(())
    }
}
