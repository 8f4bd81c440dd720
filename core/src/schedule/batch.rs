use super::{
    MutationSummary,
    OutagePeriod,
    ScheduleError,
    ScheduleMutator,
};
use crate::{
    batch::{
        default_parallelism,
        discover_files,
        run_bounded,
    },
    idf::IdfError,
    BatchReport,
    Outcome,
};
use std::{
    path::Path,
    sync::Arc,
};
use tokio_util::sync::CancellationToken;

/// Applies one outage period to every `*.idf` model of a directory.
///
/// The data dictionary is parsed once and shared by all workers. A model that fails is recorded and the batch
/// moves on.
#[derive(Debug, Clone)]
pub struct BatchScheduleMutator {
    mutator: Arc<ScheduleMutator>,
    max_parallel: usize,
    max_files: Option<usize>,
}

impl BatchScheduleMutator {
    pub fn new(mutator: ScheduleMutator) -> Self {
        Self {
            mutator: Arc::new(mutator),
            max_parallel: default_parallelism(),
            max_files: None,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Only the first `max_files` models in name order are processed.
    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    #[instrument(level = "debug", skip(self, period, cancel))]
    pub async fn run(
        &self,
        source_dir: &Path,
        destination_dir: &Path,
        period: &OutagePeriod,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchReport<MutationSummary>, ScheduleError> {
        let mut models = discover_files(source_dir, "idf").map_err(|source| IdfError::Io {
            path: source_dir.to_path_buf(),
            source,
        })?;
        if let Some(max_files) = self.max_files {
            models.truncate(max_files);
        }
        std::fs::create_dir_all(destination_dir).map_err(|source| ScheduleError::Write {
            path: destination_dir.to_path_buf(),
            source,
        })?;
        info!(
            "Applying {} from {} to {} to {} models in {}",
            period.action(),
            period.start(),
            period.end(),
            models.len(),
            source_dir.display()
        );

        let inputs = models
            .into_iter()
            .map(|model| {
                let name = model
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let destination = destination_dir.join(&name);
                (name, (model, destination))
            })
            .collect();

        let report = run_bounded(inputs, self.max_parallel, cancel, |(model, destination)| {
            let mutator = self.mutator.clone();
            let period = *period;
            async move {
                let task =
                    tokio::task::spawn_blocking(move || mutator.mutate_file(&model, &destination, &period));
                match task.await {
                    Ok(Ok(summary)) => Outcome::Success(summary),
                    Ok(Err(err)) => {
                        warn!("Schedule mutation failed: {err}");
                        Outcome::failure(err.to_string())
                    }
                    Err(err) => Outcome::failure(format!("worker failed: {err}")),
                }
            }
        })
        .await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        batch::CANCELLED_BEFORE_DISPATCH,
        idf::{
            document::tests::SMALL_MODEL,
            schema::tests::SMALL_IDD,
            Schema,
        },
        schedule::{
            MutationOptions,
            OutageAction,
        },
        CalendarDate,
    };
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn batch() -> BatchScheduleMutator {
        let schema = Arc::new(Schema::parse(SMALL_IDD).unwrap());
        BatchScheduleMutator::new(ScheduleMutator::new(schema, MutationOptions::default())).with_max_parallel(2)
    }

    fn period() -> OutagePeriod {
        OutagePeriod::until_year_end(CalendarDate::new(7, 15).unwrap(), OutageAction::DisableCooling)
    }

    #[tokio::test]
    async fn continues_past_failed_models() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        std::fs::write(source.path().join("city_0_001.idf"), SMALL_MODEL).unwrap();
        std::fs::write(source.path().join("city_0_002.idf"), "Zone,Zone1,0,0,0,0;\n").unwrap();
        std::fs::write(source.path().join("city_3_001.IDF"), SMALL_MODEL).unwrap();
        std::fs::write(source.path().join("readme.txt"), "not a model").unwrap();

        let report = batch()
            .run(source.path(), destination.path(), &period(), None)
            .await
            .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.success_rate(), "2/3 (66.7%)");
        assert_eq!(report.items[1].name, "city_0_002.idf");
        assert!(!report.items[1].outcome.is_success());
        assert!(destination.path().join("city_0_001.idf").exists());
        assert!(destination.path().join("city_3_001.IDF").exists());
        assert!(!destination.path().join("city_0_002.idf").exists());
    }

    #[tokio::test]
    async fn honours_file_limit_and_empty_directories() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();

        let report = batch().run(source.path(), destination.path(), &period(), None).await.unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.success_rate(), "0/0 (0.0%)");

        for name in ["a.idf", "b.idf", "c.idf"] {
            std::fs::write(source.path().join(name), SMALL_MODEL).unwrap();
        }
        let report = batch()
            .with_max_files(Some(2))
            .run(source.path(), destination.path(), &period(), None)
            .await
            .unwrap();
        assert_eq!(report.total(), 2);
        assert!(!destination.path().join("c.idf").exists());
    }

    #[tokio::test]
    async fn cancelled_batches_dispatch_nothing() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.idf"), SMALL_MODEL).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let report = batch()
            .run(source.path(), destination.path(), &period(), Some(&token))
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.items[0].outcome, Outcome::failure(CANCELLED_BEFORE_DISPATCH));
        assert!(!destination.path().join("a.idf").exists());
    }

    #[tokio::test]
    async fn missing_source_directory_is_an_error() {
        let destination = TempDir::new().unwrap();
        let result = batch()
            .run(&destination.path().join("absent"), destination.path(), &period(), None)
            .await;
        assert!(matches!(result, Err(ScheduleError::Model(IdfError::Io { .. }))));
    }
}
