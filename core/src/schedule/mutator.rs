use super::{
    MutationOptions,
    MutationSummary,
    OutagePeriod,
    ScheduleError,
    ScheduleMutation,
};
use crate::idf::{
    IdfDocument,
    Schema,
};
use std::{
    path::Path,
    sync::Arc,
};

/// Applies outage periods to building models, checking them against the engine's data dictionary.
#[derive(Debug, Clone)]
pub struct ScheduleMutator {
    schema: Arc<Schema>,
    options: MutationOptions,
}

impl ScheduleMutator {
    pub fn new(schema: Arc<Schema>, options: MutationOptions) -> Self {
        Self { schema, options }
    }

    pub fn from_schema_file(path: &Path, options: MutationOptions) -> Result<Self, ScheduleError> {
        let schema = Schema::from_path(path)?;
        Ok(Self::new(Arc::new(schema), options))
    }

    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    /// Validates `document`, applies `period` and validates the result.
    pub fn mutate_document(
        &self,
        document: IdfDocument,
        period: &OutagePeriod,
    ) -> Result<(IdfDocument, MutationSummary), ScheduleError> {
        self.schema.validate(&document)?;
        let mutation = ScheduleMutation::plan(&document, period, &self.options)?;
        if mutation.is_noop() {
            debug!("Model already carries the requested schedule");
        }
        let (document, summary) = mutation.apply(document);
        self.schema.validate(&document)?;
        Ok((document, summary))
    }

    /// Reads `source`, applies `period` and writes the result to `destination`. Nothing is written on error.
    #[instrument(level = "debug", skip(self, period), fields(action = %period.action()))]
    pub fn mutate_file(
        &self,
        source: &Path,
        destination: &Path,
        period: &OutagePeriod,
    ) -> Result<MutationSummary, ScheduleError> {
        let document = IdfDocument::from_path(source)?;
        let (document, mut summary) = self.mutate_document(document, period)?;

        let write_error = |source: std::io::Error| ScheduleError::Write {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = destination.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(destination, document.render()).map_err(write_error)?;

        summary.source = Some(source.to_path_buf());
        summary.destination = Some(destination.to_path_buf());
        info!(
            "{} -> {}: {} from {} to {} ({} systems modified)",
            source.display(),
            destination.display(),
            summary.action,
            summary.start,
            summary.end,
            summary.systems_modified
        );
        Ok(summary)
    }
}
