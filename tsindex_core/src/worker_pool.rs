//! Worker Pool (spec §4.2): a bounded, tokio-based parallel executor for AST
//! extraction. Accepts `(fileUri, optional preloaded content)` tasks and
//! returns `FileRecord`s; ordering is not guaranteed. Cancellation is
//! cooperative — the token is checked before each dispatch, and in-flight
//! tasks are allowed to finish with their results discarded.

use crate::cancellation::CancellationToken;
use crate::extractor::analyze_file;
use crate::model::FileRecord;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

pub const MIN_WORKERS: usize = 2;
pub const MAX_WORKERS: usize = 8;
pub const DEFAULT_WORKERS: usize = 4;

pub struct WorkItem {
    pub uri: String,
    pub content: Option<String>,
}

/// Progress callback invoked after each completion: `(completed, total, message)`.
pub type ProgressFn = Box<dyn Fn(usize, usize, Option<&str>) + Send + Sync>;

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.clamp(MIN_WORKERS, MAX_WORKERS);
        Self {
            semaphore: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run extraction across `items`, honoring `token` and reporting
    /// progress after each completion. Files that fail to read from disk
    /// (when `content` is `None`) are recorded as skipped rather than
    /// failing the batch (spec §7 item 2).
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        token: CancellationToken,
        on_progress: Option<ProgressFn>,
    ) -> Vec<FileRecord> {
        let total = items.len();
        let on_progress = on_progress.map(Arc::new);
        let mut handles = Vec::with_capacity(total);

        for item in items {
            if token.is_cancelled() {
                break;
            }
            let permit = self.semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let task_token = token.child();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let start = Instant::now();
                let result: Option<FileRecord> = match item.content {
                    Some(content) => Some(analyze_file(&item.uri, &content, &task_token)),
                    None => match std::fs::read_to_string(&item.uri) {
                        Ok(content) => Some(analyze_file(&item.uri, &content, &task_token)),
                        // ENOENT: the file vanished between scan and read — treat
                        // as a deletion, not a failure (spec §7 item 2).
                        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                        Err(err) => Some(FileRecord::skipped(item.uri.clone(), String::new(), err.to_string())),
                    },
                };
                (result, start.elapsed())
            });
            handles.push(handle);
        }

        let mut records = Vec::with_capacity(handles.len());
        let mut completed = 0usize;
        for handle in handles {
            match handle.await {
                Ok((record, _elapsed)) => {
                    completed += 1;
                    if let Some(cb) = &on_progress {
                        cb(completed, total, None);
                    }
                    if let Some(record) = record {
                        records.push(record);
                    }
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "worker task panicked");
                }
            }
        }
        records
    }

    /// Auto-tuning (spec §4.11): adjust the next pass's worker count based
    /// on the average time per file of the pass just completed.
    pub fn next_worker_count(current: usize, avg_ms_per_file: f64) -> usize {
        if avg_ms_per_file > 500.0 && current > MIN_WORKERS {
            current - 1
        } else if avg_ms_per_file < 100.0 && current < MAX_WORKERS {
            current + 1
        } else {
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_items_and_reports_progress() {
        let pool = WorkerPool::new(2);
        let items = vec![
            WorkItem {
                uri: "/a.ts".to_string(),
                content: Some("export function a() {}".to_string()),
            },
            WorkItem {
                uri: "/b.ts".to_string(),
                content: Some("export function b() {}".to_string()),
            },
        ];
        let completed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let completed_clone = completed.clone();
        let on_progress: ProgressFn = Box::new(move |done, _total, _msg| {
            completed_clone.store(done, std::sync::atomic::Ordering::SeqCst);
        });
        let records = pool.run(items, CancellationToken::new(), Some(on_progress)).await;
        assert_eq!(records.len(), 2);
        assert_eq!(completed.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn auto_tune_decrements_when_slow() {
        assert_eq!(WorkerPool::next_worker_count(4, 600.0), 3);
    }

    #[test]
    fn auto_tune_increments_when_fast() {
        assert_eq!(WorkerPool::next_worker_count(4, 50.0), 5);
    }

    #[test]
    fn auto_tune_respects_bounds() {
        assert_eq!(WorkerPool::next_worker_count(MIN_WORKERS, 600.0), MIN_WORKERS);
        assert_eq!(WorkerPool::next_worker_count(MAX_WORKERS, 50.0), MAX_WORKERS);
    }
}
