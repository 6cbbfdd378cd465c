//! End-to-end runs of the Wannier90 bands workflow against test engines.

#[cfg(test)]
mod tests {
    use crate::codes::{CodeDescriptor, CodeResources};
    use crate::config::{AdvancedSettings, Wannier90Settings};
    use crate::core::{ExitCode, Outputs, StageStatus};
    use crate::engine::{
        FnRunner, LocalEngine, MockWorkflowEngine, ProcessKind, ProcessResult, ProcessRunner,
        SubmissionRequest,
    };
    use crate::errors::{EngineError, WannierflowError};
    use crate::events::{self, CollectingEventSink};
    use crate::assembler::get_builder;
    use crate::testing::{
        assert_event_sequence, assert_namespaces, assert_sequence_done, assert_sequence_failed_at,
        assert_stage_status, fixtures, ScriptedEngine,
    };
    use crate::volumetric::IsosurfaceRunner;
    use crate::workflow::{Wannier90BandsWorkflow, GENERATE_ISOSURFACE, PW_BANDS, SKEAF, WANNIER90_BANDS};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn scripted(with_plot: bool) -> ScriptedEngine {
        ScriptedEngine::new()
            .with_outputs(ProcessKind::PwBands, fixtures::pw_bands_outputs())
            .with_outputs(ProcessKind::Wannier90Optimize, fixtures::wannier90_outputs(with_plot, 0))
            .with_outputs(ProcessKind::PythonJob, fixtures::isosurface_outputs())
            .with_outputs(ProcessKind::Skeaf, fixtures::skeaf_outputs())
    }

    #[tokio::test]
    async fn test_gates_off_exposes_only_required_namespaces() {
        let engine = scripted(false);
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let report = workflow.run(&engine, fixtures::workflow_inputs()).await.unwrap();

        assert_sequence_done(&report);
        assert_namespaces(&report, &[PW_BANDS, WANNIER90_BANDS]);
        assert_eq!(engine.submitted_kinds(), vec![ProcessKind::PwBands, ProcessKind::Wannier90Optimize]);
        assert_stage_status(&report, GENERATE_ISOSURFACE, StageStatus::Skipped);
        assert_stage_status(&report, SKEAF, StageStatus::Skipped);
        assert_eq!(report.submitted_stages(), vec![PW_BANDS, WANNIER90_BANDS]);
    }

    #[tokio::test]
    async fn test_full_run_wires_stage_outputs() {
        let engine = scripted(true);
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let report = workflow.run(&engine, fixtures::full_workflow_inputs()).await.unwrap();

        assert_sequence_done(&report);
        assert_namespaces(&report, &[PW_BANDS, WANNIER90_BANDS, GENERATE_ISOSURFACE, SKEAF]);

        let wannier = engine.submission(ProcessKind::Wannier90Optimize).unwrap();
        assert_eq!(
            wannier.input("overrides.nscf.pw.parent_folder"),
            Some(&json!({"path": fixtures::SCF_REMOTE_PATH}))
        );
        assert_eq!(wannier.input("overrides.wannier90.wannier90.bands_plot"), Some(&json!(true)));
        assert!(wannier.input("overrides.scf").is_none());
        assert!(wannier.input("kwargs.compute_dhva_frequencies").is_none());
        assert_eq!(
            wannier.input("optimize_disprojmax_range").and_then(|v| v.as_array()).map(Vec::len),
            Some(15)
        );

        let isosurface = engine.submission(ProcessKind::PythonJob).unwrap();
        assert_eq!(
            isosurface.input("parent_folder"),
            Some(&json!({"path": fixtures::PLOT_REMOTE_PATH}))
        );
        assert_eq!(isosurface.computer.as_deref(), Some("localhost"));

        let skeaf = engine.submission(ProcessKind::Skeaf).unwrap();
        assert_eq!(skeaf.input("num_electrons"), Some(&json!(8)));
        assert_eq!(skeaf.input("skeaf.parameters.num_rotation"), Some(&json!(90)));

        let outputs = report.into_result().unwrap();
        assert_eq!(outputs[GENERATE_ISOSURFACE]["parameters"]["aiida_00001"]["isovalue"], json!(0.42));
        assert!(outputs[SKEAF]["frequencies"]["band_5"].is_object());
    }

    #[tokio::test]
    async fn test_failure_halts_everything_after() {
        let engine = scripted(true).with_result(ProcessKind::PwBands, ProcessResult::failed(312));
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let report = workflow.run(&engine, fixtures::full_workflow_inputs()).await.unwrap();

        assert_sequence_failed_at(&report, PW_BANDS, ExitCode::PW_BANDS_FAILED.status);
        assert_eq!(engine.submitted_kinds(), vec![ProcessKind::PwBands]);
        assert_eq!(report.records.len(), 1);
        assert!(report.outputs.is_empty());

        match report.into_result().unwrap_err() {
            WannierflowError::StageFailure(failure) => {
                assert_eq!(failure.stage, PW_BANDS);
                assert_eq!(failure.exit_code, ExitCode::PW_BANDS_FAILED);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wannierization_failure_skips_optional_stages() {
        let engine = scripted(true).with_result(ProcessKind::Wannier90Optimize, ProcessResult::excepted("killed"));
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let report = workflow.run(&engine, fixtures::full_workflow_inputs()).await.unwrap();

        assert_sequence_failed_at(&report, WANNIER90_BANDS, ExitCode::WANNIER90_BANDS_FAILED.status);
        assert_namespaces(&report, &[PW_BANDS]);
        assert!(engine.submission(ProcessKind::PythonJob).is_none());
        assert!(engine.submission(ProcessKind::Skeaf).is_none());
    }

    #[tokio::test]
    async fn test_host_mismatch_rejected_before_any_submission() {
        let mut engine = MockWorkflowEngine::new();
        engine.expect_submit().times(0);
        engine.expect_await_completion().times(0);

        let codes = fixtures::code_selection("daint")
            .with("wannier90", CodeResources::new(CodeDescriptor::known("wannier90", "eiger")));
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let err = workflow
            .launch(&engine, &codes, fixtures::silicon(), &fixtures::workflow_parameters(), Outputs::new())
            .await
            .unwrap_err();

        match err {
            WannierflowError::ResourceHostMismatch(mismatch) => {
                assert_eq!(mismatch.hosts.get("wannier90").map(String::as_str), Some("eiger"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_integer_electron_count_aborts_skeaf() {
        let params = fixtures::workflow_parameters()
            .with_advanced(AdvancedSettings::new().with_pseudos(&fixtures::pseudos_with_valence(4.3)))
            .with_wannier90(Wannier90Settings::new().with_dhva_frequencies(true));
        let inputs = get_builder(&fixtures::full_code_selection("localhost"), fixtures::silicon(), &params, Outputs::new())
            .unwrap();
        let engine = scripted(false);
        let sink = Arc::new(CollectingEventSink::new());
        let workflow = Wannier90BandsWorkflow::new().unwrap().with_event_sink(sink.clone());

        let run = workflow.start(inputs);
        let err = workflow.run_in(&engine, &run).await.unwrap_err();

        assert!(matches!(err, WannierflowError::NonIntegerElectronCount(_)));
        assert!(engine.submission(ProcessKind::Skeaf).is_none());
        assert_eq!(run.outputs.namespaces(), vec![PW_BANDS.to_string(), WANNIER90_BANDS.to_string()]);
        assert!(run.outputs.get("wannier90_bands.band_structure").is_some());
        assert_eq!(run.store.stages(), vec![PW_BANDS.to_string(), WANNIER90_BANDS.to_string()]);
        assert_eq!(sink.stages_for(events::STAGE_FAILED), vec![SKEAF.to_string()]);
        assert_eq!(sink.names().last().map(String::as_str), Some(events::SEQUENCE_FAILED));
    }

    #[tokio::test]
    async fn test_missing_plot_output_is_an_engine_error() {
        // Plotting requested, but the Wannierization reports no plot calculation.
        let engine = scripted(false);
        let workflow = Wannier90BandsWorkflow::new().unwrap();

        let err = workflow.run(&engine, fixtures::full_workflow_inputs()).await.unwrap_err();

        match err {
            WannierflowError::Engine(EngineError::MissingOutput { stage, path }) => {
                assert_eq!(stage, WANNIER90_BANDS);
                assert_eq!(path, "wannier90_plot.remote_folder");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.submission(ProcessKind::PythonJob).is_none());
    }

    #[tokio::test]
    async fn test_event_order_with_gates_off() {
        let engine = scripted(false);
        let sink = Arc::new(CollectingEventSink::new());
        let workflow = Wannier90BandsWorkflow::new().unwrap().with_event_sink(sink.clone());

        workflow.run(&engine, fixtures::workflow_inputs()).await.unwrap();

        assert_event_sequence(
            &sink,
            &[
                events::STAGE_STARTED,
                events::STAGE_SUBMITTED,
                events::STAGE_COMPLETED,
                events::STAGE_STARTED,
                events::STAGE_SUBMITTED,
                events::STAGE_COMPLETED,
                events::STAGE_SKIPPED,
                events::STAGE_SKIPPED,
                events::SEQUENCE_COMPLETED,
            ],
        );
        assert_eq!(
            sink.stages_for(events::STAGE_SKIPPED),
            vec![GENERATE_ISOSURFACE.to_string(), SKEAF.to_string()]
        );
    }

    #[tokio::test]
    async fn test_local_engine_contours_plot_folder() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("aiida_00001.xsf"),
            "BEGIN_BLOCK_DATAGRID_3D\nwf\nBEGIN_DATAGRID_3D_wf\n2 2 2\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n\
             -4 -3 -2 -1 1 2 3 4\nEND_DATAGRID_3D\nEND_BLOCK_DATAGRID_3D\n",
        )
        .unwrap();
        let folder = dir.path().to_string_lossy().into_owned();

        let pw: Arc<dyn ProcessRunner> = Arc::new(FnRunner::new("pw_bands", |_: &SubmissionRequest| {
            ProcessResult::ok(fixtures::pw_bands_outputs())
        }));
        let wannier: Arc<dyn ProcessRunner> = Arc::new(FnRunner::new("wannier90", move |_: &SubmissionRequest| {
            let mut outputs = fixtures::wannier90_outputs(true, 0);
            outputs["wannier90_plot"]["remote_folder"] = json!({"path": folder.clone()});
            ProcessResult::ok(outputs)
        }));
        let engine = LocalEngine::new()
            .with_runner(ProcessKind::PwBands, pw)
            .with_runner(ProcessKind::Wannier90Optimize, wannier)
            .with_runner(ProcessKind::PythonJob, Arc::new(IsosurfaceRunner));

        let params = fixtures::workflow_parameters()
            .with_wannier90(Wannier90Settings::new().with_plot_wannier_functions(true));
        let workflow = Wannier90BandsWorkflow::new().unwrap();
        let report = workflow
            .launch(&engine, &fixtures::full_code_selection("localhost"), fixtures::silicon(), &params, Outputs::new())
            .await
            .unwrap();

        assert_sequence_done(&report);
        let isovalue = report.outputs[GENERATE_ISOSURFACE]["parameters"]["aiida_00001"]["isovalue"]
            .as_f64()
            .unwrap();
        assert!((isovalue - 3.3).abs() < 1e-12);
        assert!(report.outputs[GENERATE_ISOSURFACE]["mesh_data"]["aiida_00001_negative_faces"].is_array());
        assert_eq!(engine.pending(), 0);
    }
}
