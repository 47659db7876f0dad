//! 访问统计管理器
//!
//! 负责收集和刷新短链接访问计数，支持：
//! - 高并发计数（使用 DashMap）
//! - 定时刷盘到存储后端
//! - 阈值触发刷盘
//!
//! 刷盘只写增量（`clicks = clicks + n`），失败时增量退回缓冲区。

use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, trace, warn};

use crate::analytics::{VisitDelta, VisitSink};

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    clicks: u64,
    unique_clicks: u64,
}

/// 访问缓冲区状态，封装所有可变状态
struct VisitBuffer {
    data: DashMap<Arc<str>, Counts>,
    /// 缓冲区中的总访问数（用于阈值判断）
    total_visits: AtomicUsize,
    /// 刷盘锁，防止并发刷盘
    flush_lock: Mutex<()>,
    /// 是否有 flush 任务待处理（防止重复 spawn）
    flush_pending: AtomicBool,
}

impl VisitBuffer {
    fn new() -> Self {
        Self {
            data: DashMap::new(),
            total_visits: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
            flush_pending: AtomicBool::new(false),
        }
    }

    fn increment(&self, key: &str, unique: bool) -> usize {
        let unique_inc = u64::from(unique);
        // 热点 key 走 get_mut，避免 Arc 分配
        if let Some(mut entry) = self.data.get_mut(key) {
            entry.clicks += 1;
            entry.unique_clicks += unique_inc;
        } else {
            self.data
                .entry(Arc::from(key))
                .and_modify(|c| {
                    c.clicks += 1;
                    c.unique_clicks += unique_inc;
                })
                .or_insert(Counts {
                    clicks: 1,
                    unique_clicks: unique_inc,
                });
        }
        trace!("VisitBuffer: Incremented key: {}", key);

        self.total_visits.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 逐个 remove snapshot 中的 key，不影响窗口期新增
    fn drain(&self) -> Vec<VisitDelta> {
        let keys: Vec<Arc<str>> = self.data.iter().map(|r| r.key().clone()).collect();

        let mut updates = Vec::with_capacity(keys.len());
        let mut total_removed = 0usize;
        for key in keys {
            if let Some((k, v)) = self.data.remove(&key) {
                total_removed += v.clicks as usize;
                updates.push(VisitDelta {
                    code: k.to_string(),
                    clicks: v.clicks,
                    unique_clicks: v.unique_clicks,
                });
            }
        }

        if total_removed > 0 {
            self.total_visits
                .fetch_update(Ordering::Release, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(total_removed))
                })
                .ok();
        }

        updates
    }

    /// 刷盘失败时把增量退回缓冲区
    fn restore(&self, updates: Vec<VisitDelta>) {
        let mut restored_total = 0usize;
        for delta in updates {
            let mut entry = self.data.entry(Arc::from(delta.code.as_str())).or_default();
            entry.clicks += delta.clicks;
            entry.unique_clicks += delta.unique_clicks;
            restored_total += delta.clicks as usize;
        }
        self.total_visits
            .fetch_add(restored_total, Ordering::Relaxed);
    }

    fn total(&self) -> usize {
        self.total_visits.load(Ordering::Relaxed)
    }
}

/// 访问管理器
///
/// 收集访问计数并定期刷盘到存储后端。
#[derive(Clone)]
pub struct VisitManager {
    buffer: Arc<VisitBuffer>,
    sink: Arc<dyn VisitSink>,
    flush_interval: Duration,
    max_visits_before_flush: usize,
}

impl VisitManager {
    pub fn new(
        sink: Arc<dyn VisitSink>,
        flush_interval: Duration,
        max_visits_before_flush: usize,
    ) -> Self {
        Self {
            buffer: Arc::new(VisitBuffer::new()),
            sink,
            flush_interval,
            max_visits_before_flush,
        }
    }

    /// 记录一次访问（线程安全，无锁）
    pub fn record(&self, code: &str, unique: bool) {
        let current_size = self.buffer.increment(code, unique);
        trace!("VisitManager: Current buffer size: {}", current_size);

        if current_size >= self.max_visits_before_flush {
            // 只有成功把 flush_pending 从 false 设为 true 的调用方才 spawn
            if self
                .buffer
                .flush_pending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                let buffer = Arc::clone(&self.buffer);
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    if let Ok(_guard) = buffer.flush_lock.try_lock() {
                        Self::flush_buffer(&buffer, &sink).await;
                    } else {
                        trace!("VisitManager: flush already in progress, skipping");
                    }
                    buffer.flush_pending.store(false, Ordering::Release);
                });
            }
        }
    }

    /// 后台定时刷盘（永不返回）
    pub async fn start_background_task(&self) {
        loop {
            sleep(self.flush_interval).await;

            debug!("VisitManager: Triggering scheduled flush");
            if let Ok(_guard) = self.buffer.flush_lock.try_lock() {
                Self::flush_buffer(&self.buffer, &self.sink).await;
            } else {
                trace!("VisitManager: flush already in progress, skipping scheduled flush");
            }
        }
    }

    /// 手动刷盘（等待进行中的刷盘结束）
    pub async fn flush(&self) {
        debug!("VisitManager: Manual flush triggered");
        let _guard = self.buffer.flush_lock.lock().await;
        Self::flush_buffer(&self.buffer, &self.sink).await;
    }

    async fn flush_buffer(buffer: &VisitBuffer, sink: &Arc<dyn VisitSink>) {
        let updates = buffer.drain();

        if updates.is_empty() {
            trace!("VisitManager: No visits to flush");
            return;
        }

        let count = updates.len();
        match sink.flush_visits(updates.clone()).await {
            Ok(_) => {
                debug!("VisitManager: Successfully flushed {} entries", count);
            }
            Err(e) => {
                buffer.restore(updates);
                warn!(
                    "VisitManager: flush_visits failed: {}, {} entries restored to buffer",
                    e, count
                );
            }
        }
    }

    /// 当前缓冲区中尚未刷盘的访问数
    pub fn buffer_size(&self) -> usize {
        self.buffer.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockSink {
        flushed: std::sync::Mutex<Vec<VisitDelta>>,
        fail: AtomicBool,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                flushed: std::sync::Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            }
        }

        fn total_clicks(&self) -> u64 {
            self.flushed.lock().unwrap().iter().map(|d| d.clicks).sum()
        }

        fn total_unique(&self) -> u64 {
            self.flushed
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.unique_clicks)
                .sum()
        }
    }

    #[async_trait]
    impl VisitSink for MockSink {
        async fn flush_visits(&self, updates: Vec<VisitDelta>) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("sink unavailable");
            }
            self.flushed.lock().unwrap().extend(updates);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_record_and_flush() {
        let sink = Arc::new(MockSink::new());
        let manager = VisitManager::new(
            Arc::clone(&sink) as Arc<dyn VisitSink>,
            Duration::from_secs(60),
            100,
        );

        manager.record("abc123", true);
        manager.record("abc123", false);
        manager.record("spring-promo", true);

        assert_eq!(manager.buffer_size(), 3);

        manager.flush().await;

        assert_eq!(manager.buffer_size(), 0);
        assert_eq!(sink.total_clicks(), 3);
        assert_eq!(sink.total_unique(), 2);
        assert_eq!(sink.flushed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_flush_restores_deltas() {
        let sink = Arc::new(MockSink::new());
        let manager = VisitManager::new(
            Arc::clone(&sink) as Arc<dyn VisitSink>,
            Duration::from_secs(60),
            100,
        );

        manager.record("abc123", true);
        manager.record("abc123", true);
        sink.fail.store(true, Ordering::SeqCst);
        manager.flush().await;
        assert_eq!(manager.buffer_size(), 2);

        sink.fail.store(false, Ordering::SeqCst);
        manager.flush().await;
        assert_eq!(manager.buffer_size(), 0);
        assert_eq!(sink.total_clicks(), 2);
        assert_eq!(sink.total_unique(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_record_and_drain() {
        let sink = Arc::new(MockSink::new());
        let manager = Arc::new(VisitManager::new(
            Arc::clone(&sink) as Arc<dyn VisitSink>,
            Duration::from_secs(60),
            100000,
        ));

        const NUM_TASKS: usize = 10;
        const VISITS_PER_TASK: usize = 1000;

        let mut handles = vec![];
        for i in 0..NUM_TASKS {
            let mgr = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                for j in 0..VISITS_PER_TASK {
                    mgr.record("shared", (i + j) % 3 == 0);
                    if j % 97 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        let mgr_flush = Arc::clone(&manager);
        let flush_handle = tokio::spawn(async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                mgr_flush.flush().await;
            }
        });

        for handle in handles {
            handle.await.unwrap();
        }
        flush_handle.await.unwrap();
        manager.flush().await;

        assert_eq!(sink.total_clicks() as usize, NUM_TASKS * VISITS_PER_TASK);
        assert!(sink.total_unique() <= sink.total_clicks());
    }
}
