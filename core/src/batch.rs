//! Shared bookkeeping for operations that fan out over many building models.

use futures::{
    stream,
    Future,
    StreamExt,
};
use serde::Serialize;
use std::{
    io,
    num::NonZeroUsize,
    path::{
        Path,
        PathBuf,
    },
};
use tokio_util::sync::CancellationToken;

pub const CANCELLED_BEFORE_DISPATCH: &str = "cancelled before dispatch";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure { reason: String, detail: Option<T> },
}

impl<T> Outcome<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem<T> {
    /// 1-based position in discovery order.
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: String,
    pub items: Vec<BatchItem<T>>,
}

impl<T> BatchReport<T> {
    pub fn from_items(mut items: Vec<BatchItem<T>>) -> Self {
        items.sort_by_key(|item| item.index);
        let successful = items.iter().filter(|item| item.outcome.is_success()).count();
        let total = items.len();
        Self {
            total,
            successful,
            failed: total - successful,
            success_rate: format_success_rate(successful, total),
            items,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// `"successful/total (xx.x%)"`, or `"0/0 (0.0%)"` for an empty batch.
    pub fn success_rate(&self) -> &str {
        &self.success_rate
    }

    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| match &item.outcome {
            Outcome::Success(value) => Some(value),
            Outcome::Failure { .. } => None,
        })
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

fn format_success_rate(successful: usize, total: usize) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        successful as f64 * 100.0 / total as f64
    };
    format!("{successful}/{total} ({percent:.1}%)")
}

pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Lists files in `dir` with the given extension (case-insensitive), sorted by file name.
pub fn discover_files(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Lists the subdirectories of `dir`, sorted by name.
pub fn discover_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Runs `work` over `inputs` with at most `max_parallel` units in flight.
///
/// Units not yet dispatched when `cancel` fires are recorded as failures. The report lists items in input order
/// regardless of completion order.
pub async fn run_bounded<I, T, F, Fut>(
    inputs: Vec<(String, I)>,
    max_parallel: usize,
    cancel: Option<&CancellationToken>,
    work: F,
) -> BatchReport<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let total = inputs.len();
    let work = &work;

    let items: Vec<BatchItem<T>> = stream::iter(inputs.into_iter().enumerate())
        .map(|(idx, (name, input))| async move {
            let index = idx + 1;
            let outcome = if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!("[{index}/{total}] {name}: {CANCELLED_BEFORE_DISPATCH}");
                Outcome::failure(CANCELLED_BEFORE_DISPATCH)
            } else {
                info!("[{index}/{total}] {name}");
                work(input).await
            };
            BatchItem { index, name, outcome }
        })
        .buffer_unordered(max_parallel.max(1))
        .collect()
        .await;

    let report = BatchReport::from_items(items);
    info!("Batch finished: {} succeeded", report.success_rate());
    report
}
