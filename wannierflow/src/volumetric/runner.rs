//! Local runner for the isosurface job.

use super::folder::process_folder;
use super::DEFAULT_PERCENTILE;
use crate::engine::{ProcessResult, ProcessRunner, SubmissionRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// Runs `process_volumetric_folder` on the submitted `parent_folder`.
///
/// The folder input is either a path string or an object with a `path`
/// field. Outputs are limited to the requested `output_ports`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsosurfaceRunner;

impl IsosurfaceRunner {
    fn folder(request: &SubmissionRequest) -> Option<PathBuf> {
        match request.input("parent_folder")? {
            Value::String(path) => Some(PathBuf::from(path)),
            Value::Object(map) => map.get("path").and_then(Value::as_str).map(PathBuf::from),
            _ => None,
        }
    }
}

#[async_trait]
impl ProcessRunner for IsosurfaceRunner {
    async fn run(&self, request: SubmissionRequest) -> ProcessResult {
        let Some(folder) = Self::folder(&request) else {
            return ProcessResult::excepted("parent_folder input is missing or has no path");
        };
        let percentile = request
            .input("percentile")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_PERCENTILE);

        info!(folder = %folder.display(), percentile, "Generating isosurfaces");
        let joined = tokio::task::spawn_blocking(move || process_folder(&folder, percentile)).await;

        let outputs = match joined {
            Ok(Ok(result)) => match result.to_outputs() {
                Ok(outputs) => outputs,
                Err(err) => return ProcessResult::excepted(err.to_string()),
            },
            Ok(Err(err)) => {
                warn!(error = %format!("{err:#}"), "Isosurface job failed");
                return ProcessResult::excepted(format!("{err:#}"));
            }
            Err(err) => return ProcessResult::excepted(err.to_string()),
        };

        let ports: Option<Vec<&str>> = request
            .input("output_ports")
            .and_then(Value::as_array)
            .map(|ports| ports.iter().filter_map(Value::as_str).collect());
        let outputs = match ports {
            Some(ports) => outputs
                .into_iter()
                .filter(|(key, _)| ports.contains(&key.as_str()))
                .collect(),
            None => outputs,
        };
        ProcessResult::ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Outputs;
    use crate::engine::{ProcessKind, ProcessState};
    use serde_json::json;
    use tempfile::TempDir;

    fn request(inputs: Value) -> SubmissionRequest {
        let inputs: Outputs = serde_json::from_value(inputs).unwrap();
        SubmissionRequest::new(ProcessKind::PythonJob, "generate_isosurface", inputs)
    }

    #[tokio::test]
    async fn test_runs_folder_and_filters_ports() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("wf.xsf"),
            "BEGIN_DATAGRID_3D\n2 2 2\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n-4 -3 -2 -1 1 2 3 4\nEND_DATAGRID_3D\n",
        )
        .unwrap();

        let result = IsosurfaceRunner
            .run(request(json!({
                "parent_folder": {"path": dir.path().to_string_lossy()},
                "percentile": 90.0,
                "output_ports": ["parameters", "mesh_data"],
            })))
            .await;

        assert_eq!(result.state, ProcessState::Finished { exit_status: 0 });
        assert!(result.outputs.contains_key("parameters"));
        assert!(!result.outputs.contains_key("atoms"));
    }

    #[tokio::test]
    async fn test_missing_folder_input_excepts() {
        let result = IsosurfaceRunner.run(request(json!({"percentile": 90.0}))).await;
        assert!(matches!(result.state, ProcessState::Excepted { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_folder_excepts() {
        let result = IsosurfaceRunner
            .run(request(json!({"parent_folder": "/nonexistent/wannierflow/folder"})))
            .await;
        match result.state {
            ProcessState::Excepted { message } => assert!(message.starts_with("cannot list")),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
