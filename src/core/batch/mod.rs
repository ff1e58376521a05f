//! 批量脉搏信号提取管理器

pub mod writer;

pub use writer::{append_csv_row, read_json_records, write_csv_row, write_json_records};

use crate::core::pulse::{PulseConfig, PulseError, PulseMethod};
use crate::core::video::FrameSequence;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

const MAX_BATCH_THREADS: usize = 8;

/// 待提取的带标签 ROI 片段
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub label: i64,
    pub frames: FrameSequence,
}

/// 序列化为 `{ "label": .., "signal": [..] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseRecord {
    pub label: i64,
    pub signal: Vec<f64>,
}

/// 失败条目（输入序号 + 错误）
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub label: i64,
    pub error: PulseError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 成功结果（保持输入顺序）
    pub records: Vec<PulseRecord>,
    pub failures: Vec<BatchFailure>,
}

/// 提取统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed_items: u64,
    pub failed_items: u64,
}

/// 批量处理器 - 独立 rayon 线程池，每个片段运行一次管线
pub struct BatchProcessor {
    method: PulseMethod,
    config: PulseConfig,
    pool: rayon::ThreadPool,
    processed_count: Arc<Mutex<u64>>,
    failed_count: Arc<Mutex<u64>>,
}

impl BatchProcessor {
    pub fn new(method: PulseMethod, config: PulseConfig) -> Result<Self, PulseError> {
        Self::with_threads(method, config, num_cpus::get().min(MAX_BATCH_THREADS))
    }

    pub fn with_threads(
        method: PulseMethod,
        config: PulseConfig,
        threads: usize,
    ) -> Result<Self, PulseError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pulse-batch-{i}"))
            .build()
            .map_err(|e| PulseError::config("threads", e.to_string()))?;

        info!(
            "🧵 BatchProcessor: {} method on {} threads",
            method,
            pool.current_num_threads()
        );
        Ok(Self {
            method,
            config,
            pool,
            processed_count: Arc::new(Mutex::new(0)),
            failed_count: Arc::new(Mutex::new(0)),
        })
    }

    pub fn method(&self) -> PulseMethod {
        self.method
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    pub fn get_stats(&self) -> BatchStats {
        BatchStats {
            processed_items: *lock_counter(&self.processed_count),
            failed_items: *lock_counter(&self.failed_count),
        }
    }

    pub fn reset(&self) {
        *lock_counter(&self.processed_count) = 0;
        *lock_counter(&self.failed_count) = 0;
    }

    /// 批量处理 - 每个片段独立计算，保持输入顺序
    pub fn process_batch(&self, items: &[BatchItem]) -> BatchOutcome {
        let method = self.method;
        let config = &self.config;

        let results: Vec<_> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| method.compute(&item.frames, config))
                .collect()
        });

        let mut outcome = BatchOutcome::default();
        for (index, (item, result)) in items.iter().zip(results).enumerate() {
            match result {
                Ok(signal) => outcome.records.push(PulseRecord {
                    label: item.label,
                    signal,
                }),
                Err(error) => {
                    warn!("⚠️ Batch item {} (label {}) skipped: {}", index, item.label, error);
                    outcome.failures.push(BatchFailure {
                        index,
                        label: item.label,
                        error,
                    });
                }
            }
        }

        *lock_counter(&self.processed_count) += items.len() as u64;
        *lock_counter(&self.failed_count) += outcome.failures.len() as u64;

        info!(
            "✓ Batch done: {} records, {} failures",
            outcome.records.len(),
            outcome.failures.len()
        );
        outcome
    }
}

/// 计数器加锁，锁中毒时沿用内部值
fn lock_counter(counter: &Mutex<u64>) -> MutexGuard<'_, u64> {
    counter.lock().unwrap_or_else(|poisoned| {
        warn!("⚠️ 统计计数器锁已中毒，继续使用当前值");
        poisoned.into_inner()
    })
}
