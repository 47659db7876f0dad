/// 一个短链接在一次刷盘窗口内累计的增量
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitDelta {
    pub code: String,
    pub clicks: u64,
    pub unique_clicks: u64,
}

/// 访问计数 Sink（聚合模式）
#[async_trait::async_trait]
pub trait VisitSink: Send + Sync {
    async fn flush_visits(&self, updates: Vec<VisitDelta>) -> anyhow::Result<()>;
}
