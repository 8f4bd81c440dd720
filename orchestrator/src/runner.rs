use crate::{
    engine::EngineConfig,
    tool::{
        ExternalTool,
        ProcessTool,
        ToolCommand,
        ToolOutput,
    },
};
use serde::Serialize;
use std::{
    fmt,
    io,
    path::{
        Path,
        PathBuf,
    },
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use ubem_core::{
    batch::{
        discover_files,
        run_bounded,
    },
    BatchReport,
    Outcome,
};

pub const STDOUT_LOG: &str = "engine.stdout.log";
pub const STDERR_LOG: &str = "engine.stderr.log";

#[derive(thiserror::Error, Debug)]
pub enum OrchestratorError {
    #[error("Failed to list models in {dir:?}")]
    Discover {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output directory {dir:?}")]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One model to simulate against one weather file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub building_id: String,
    pub model: PathBuf,
    pub weather: PathBuf,
    pub output_dir: PathBuf,
}

impl SimulationRequest {
    /// Names the run after the model's file stem and places its output in `<output_root>/<stem>`.
    pub fn for_model(model: &Path, weather: &Path, output_root: &Path) -> Self {
        let building_id = model
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            output_dir: output_root.join(&building_id),
            building_id,
            model: model.to_path_buf(),
            weather: weather.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// The engine ran but exited non-zero or left expected output missing.
    EngineFailure { exit_code: Option<i32>, reason: String },
    /// The engine could not be run to completion: not found, not startable or timed out.
    OrchestrationFailure { reason: String },
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str(self.as_ref()),
            RunStatus::EngineFailure { reason, .. } | RunStatus::OrchestrationFailure { reason } => {
                write!(f, "{}: {reason}", self.as_ref())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub building_id: String,
    pub model: PathBuf,
    pub weather: PathBuf,
    pub output_dir: PathBuf,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
}

impl SimulationRun {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Drives the simulation engine through an [`ExternalTool`].
#[derive(Debug, Clone)]
pub struct SimulationOrchestrator<T = ProcessTool> {
    tool: T,
    config: EngineConfig,
}

impl SimulationOrchestrator<ProcessTool> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_tool(ProcessTool, config)
    }
}

impl<T: ExternalTool> SimulationOrchestrator<T> {
    pub fn with_tool(tool: T, config: EngineConfig) -> Self {
        Self { tool, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one simulation to completion or until the configured timeout kills it.
    #[instrument(level = "debug", skip(self, request), fields(building = %request.building_id))]
    pub async fn run(&self, request: &SimulationRequest) -> SimulationRun {
        let started = Instant::now();
        let (status, exit_code) = match tokio::time::timeout(self.config.timeout, self.execute(request)).await {
            Ok(result) => result,
            Err(_) => {
                let reason = format!("timed out after {:?}", self.config.timeout);
                self.write_timeout_log(request, &reason).await;
                (RunStatus::OrchestrationFailure { reason }, None)
            }
        };
        let duration_secs = started.elapsed().as_secs_f64();
        match &status {
            RunStatus::Success => info!("{} finished in {duration_secs:.1}s", request.building_id),
            failure => warn!("{} failed after {duration_secs:.1}s: {failure}", request.building_id),
        }
        SimulationRun {
            building_id: request.building_id.clone(),
            model: request.model.clone(),
            weather: request.weather.clone(),
            output_dir: request.output_dir.clone(),
            status,
            exit_code,
            duration_secs,
        }
    }

    async fn execute(&self, request: &SimulationRequest) -> (RunStatus, Option<i32>) {
        if let Err(err) = tokio::fs::create_dir_all(&request.output_dir).await {
            let reason = format!("cannot create {}: {err}", request.output_dir.display());
            return (RunStatus::OrchestrationFailure { reason }, None);
        }
        for artifact in &self.config.expected_artifacts {
            let path = request.output_dir.join(artifact);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    let reason = format!("cannot remove stale {}: {err}", path.display());
                    return (RunStatus::OrchestrationFailure { reason }, None);
                }
            }
        }

        let model = self.prepare_model(request).await;
        let command = self.engine_command(request, &model);
        debug!("Running {command}");
        let output = match self.tool.run(&command).await {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let reason = format!("executable not found: {}", command.program.display());
                return (RunStatus::OrchestrationFailure { reason }, None);
            }
            Err(err) => {
                let reason = format!("failed to start {}: {err}", command.program.display());
                return (RunStatus::OrchestrationFailure { reason }, None);
            }
        };
        self.write_logs(&request.output_dir, &output).await;

        let exit_code = output.exit_code;
        if !output.success() {
            let reason = match exit_code {
                Some(code) => format!("engine exited with code {code}"),
                None => "engine was terminated by a signal".to_string(),
            };
            return (RunStatus::EngineFailure { exit_code, reason }, exit_code);
        }

        let mut missing = Vec::new();
        for artifact in &self.config.expected_artifacts {
            let path = request.output_dir.join(artifact);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                missing.push(artifact.as_str());
            }
        }
        if !missing.is_empty() {
            let reason = format!("missing output {}", missing.join(", "));
            return (RunStatus::EngineFailure { exit_code, reason }, exit_code);
        }
        (RunStatus::Success, exit_code)
    }

    /// `-x` runs ExpandObjects inside the engine and `-r` runs ReadVarsESO, which produces `eplusout.csv`.
    fn engine_command(&self, request: &SimulationRequest, model: &Path) -> ToolCommand {
        let mut command = ToolCommand::new(&self.config.energyplus_exe)
            .arg("-w")
            .arg(&request.weather)
            .arg("-d")
            .arg(&request.output_dir);
        if let Some(schema) = &self.config.schema_file {
            command = command.arg("-i").arg(schema);
        }
        command.arg("-x").arg("-r").arg(model)
    }

    /// Runs ExpandObjects on a copy of the model in the output directory. Falls back to the model itself when
    /// that does not produce `expanded.idf`.
    async fn prepare_model(&self, request: &SimulationRequest) -> PathBuf {
        let Some(expand_objects) = &self.config.expand_objects_exe else {
            return request.model.clone();
        };
        if !tokio::fs::try_exists(expand_objects).await.unwrap_or(false) {
            debug!("{} not found, skipping ExpandObjects", expand_objects.display());
            return request.model.clone();
        }

        let input = request.output_dir.join("in.idf");
        if let Err(err) = tokio::fs::copy(&request.model, &input).await {
            warn!("Cannot stage {} for ExpandObjects: {err}", request.model.display());
            return request.model.clone();
        }
        let command = ToolCommand::new(expand_objects).current_dir(&request.output_dir);
        match self.tool.run(&command).await {
            Ok(output) if output.success() => {}
            Ok(output) => {
                warn!("ExpandObjects exited with {:?}, using the original model", output.exit_code);
                return request.model.clone();
            }
            Err(err) => {
                warn!("ExpandObjects failed to run: {err}");
                return request.model.clone();
            }
        }

        let expanded = request.output_dir.join("expanded.idf");
        if tokio::fs::try_exists(&expanded).await.unwrap_or(false) {
            expanded
        } else {
            request.model.clone()
        }
    }

    async fn write_logs(&self, output_dir: &Path, output: &ToolOutput) {
        for (name, content) in [(STDOUT_LOG, &output.stdout), (STDERR_LOG, &output.stderr)] {
            let path = output_dir.join(name);
            if let Err(err) = tokio::fs::write(&path, content).await {
                warn!("Failed to write {}: {err}", path.display());
            }
        }
    }

    /// The engine's output is lost with its future, so only the command line and the timeout are recorded.
    async fn write_timeout_log(&self, request: &SimulationRequest, reason: &str) {
        if let Err(err) = tokio::fs::create_dir_all(&request.output_dir).await {
            warn!("Cannot create {}: {err}", request.output_dir.display());
            return;
        }
        let command = self.engine_command(request, &request.model);
        let output = ToolOutput {
            exit_code: None,
            stdout: Vec::new(),
            stderr: format!("{reason}\ncommand: {command}\n").into_bytes(),
        };
        self.write_logs(&request.output_dir, &output).await;
    }

    /// Simulates every `*.idf` model in `models_dir` against `weather`, each into `<output_root>/<model stem>`.
    ///
    /// Failed runs are recorded with their [`SimulationRun`] as detail and the batch continues.
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn run_batch(
        &self,
        models_dir: &Path,
        weather: &Path,
        output_root: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchReport<SimulationRun>, OrchestratorError> {
        let mut models = discover_files(models_dir, "idf").map_err(|source| OrchestratorError::Discover {
            dir: models_dir.to_path_buf(),
            source,
        })?;
        if let Some(max_runs) = self.config.max_runs {
            models.truncate(max_runs);
        }
        tokio::fs::create_dir_all(output_root)
            .await
            .map_err(|source| OrchestratorError::OutputDir {
                dir: output_root.to_path_buf(),
                source,
            })?;
        info!(
            "Simulating {} models from {} with {} ({} at a time)",
            models.len(),
            models_dir.display(),
            weather.display(),
            self.config.max_parallel
        );

        let inputs = models
            .iter()
            .map(|model| {
                let request = SimulationRequest::for_model(model, weather, output_root);
                (request.building_id.clone(), request)
            })
            .collect();
        let report = run_bounded(inputs, self.config.max_parallel, cancel, |request| async move {
            let run = self.run(&request).await;
            if run.is_success() {
                Outcome::Success(run)
            } else {
                Outcome::Failure {
                    reason: run.status.to_string(),
                    detail: Some(run),
                }
            }
        })
        .await;
        Ok(report)
    }
}
