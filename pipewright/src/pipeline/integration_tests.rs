//! Scenario tests for pipeline execution.

#[cfg(test)]
mod tests {
    use crate::config::{LocalExecConfig, PipelineConfig};
    use crate::context::StageContext;
    use crate::core::{Deployment, DeploymentType, Link, LogLevel, TestReport, TestResult, TestStatus, TestSuiteResult};
    use crate::errors::PipelineError;
    use crate::events::PipelineEvent;
    use crate::stages::{handler, StageGroup};
    use crate::testing::{
        assert_end_event, assert_log_event, assert_start_event, stage_sequence, FailingHandler,
        RecordingHandler, SlowHandler, TestPipeline,
    };
    use anyhow::Context as _;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn ok(_ctx: StageContext) -> impl std::future::Future<Output = anyhow::Result<()>> {
        async { Ok(()) }
    }

    fn end_reason(event: &PipelineEvent) -> String {
        match event {
            PipelineEvent::EndStage(end) => end.reason.clone().unwrap_or_default(),
            other => panic!("expected end event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sequential_stages_emit_start_end_pairs() {
        let mut pipeline = TestPipeline::new();
        for name in ["Build", "Test", "Package"] {
            assert!(pipeline.stage(name, ok).await);
        }

        let events = pipeline.events();
        assert_eq!(events.len(), 6);
        for (pair, name) in events.chunks(2).zip(["Build", "Test", "Package"]) {
            assert_start_event(&pair[0], name, None, None);
            let end = assert_end_event(&pair[1], name, false);
            assert_eq!(end.test_results, None);
        }
        assert_eq!(pipeline.failures(), 0);
    }

    #[tokio::test]
    async fn test_failing_stage_reports_reason_once() {
        let mut pipeline = TestPipeline::new();
        assert!(!pipeline.stage("Build", FailingHandler::new("compilation failed")).await);

        let events = pipeline.events();
        assert_eq!(events.len(), 2);
        assert_start_event(&events[0], "Build", None, None);
        assert_end_event(&events[1], "Build", true);
        assert_eq!(end_reason(&events[1]), "Failure: compilation failed");
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test]
    async fn test_reason_renders_cause_chain() {
        let failing = |_ctx: StageContext| async move {
            Err::<(), _>(std::io::Error::other("disk full"))
                .context("writing artifact")
        };

        let mut pipeline = TestPipeline::new();
        pipeline.stage("Package", failing).await;
        assert_eq!(
            end_reason(&pipeline.events()[1]),
            "Error: writing artifact\nCaused by: disk full"
        );

        let mut pipeline =
            TestPipeline::with_config(PipelineConfig::default().with_render_cause_chain(false));
        pipeline.stage("Package", failing).await;
        assert_eq!(end_reason(&pipeline.events()[1]), "Error: writing artifact");
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_failure() {
        let mut pipeline = TestPipeline::new();
        let ok = pipeline
            .stage("Explode", |_ctx: StageContext| async move {
                if true {
                    panic!("kaboom");
                }
                anyhow::Ok(())
            })
            .await;
        assert!(!ok);
        assert_eq!(end_reason(&pipeline.events()[1]), "Panic: kaboom");
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_members_are_not_interleaved() {
        let mut pipeline = TestPipeline::new();
        let group = StageGroup::new()
            .with("slow", SlowHandler::new(Duration::from_millis(300)))
            .with("fast", SlowHandler::new(Duration::from_millis(20)));
        assert!(pipeline.parallel("Checks", group).await);

        let events = pipeline.events();
        assert_eq!(events.len(), 8);
        let mut starts: Vec<&str> = events[..2]
            .iter()
            .map(|e| {
                assert_eq!(e.kind(), "StartStageEvent");
                e.stage().unwrap_or_default()
            })
            .collect();
        starts.sort_unstable();
        assert_eq!(starts, ["fast", "slow"]);

        assert_log_event(&events[2], "fast", LogLevel::Info, "fast starting");
        assert_log_event(&events[3], "fast", LogLevel::Info, "fast done");
        assert_end_event(&events[4], "fast", false);
        assert_log_event(&events[5], "slow", LogLevel::Info, "slow starting");
        assert_log_event(&events[6], "slow", LogLevel::Info, "slow done");
        assert_end_event(&events[7], "slow", false);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_members_run_concurrently() {
        let mut pipeline = TestPipeline::new();
        let group = StageGroup::new()
            .with("a", SlowHandler::new(Duration::from_millis(400)))
            .with("b", SlowHandler::new(Duration::from_millis(400)));
        let started = std::time::Instant::now();
        assert!(pipeline.parallel("Checks", group).await);
        assert!(started.elapsed() < Duration::from_millis(750));
        match &pipeline.events()[0] {
            PipelineEvent::StartStage(start) => assert_eq!(start.parallel.as_deref(), Some("Checks")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_failure_does_not_cancel_siblings() {
        let recorder = RecordingHandler::new();
        let slow_recorder = recorder.clone();
        let mut pipeline = TestPipeline::new();
        let group = StageGroup::new()
            .with("lint", FailingHandler::new("lint errors"))
            .with("test", move |ctx: StageContext| {
                let recorder = slow_recorder.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    crate::stages::StageHandler::run(&recorder, &ctx).await
                }
            });
        assert!(!pipeline.parallel("Checks", group).await);

        assert_eq!(recorder.stages(), ["test"]);
        assert_eq!(pipeline.failures(), 1);
        let ends = pipeline.sink().events_of_kind("EndStageEvent");
        assert_eq!(ends.len(), 2);
        assert_end_event(&ends[0], "lint", true);
        assert_end_event(&ends[1], "test", false);
    }

    #[tokio::test]
    async fn test_empty_parallel_group_succeeds_silently() {
        let mut pipeline = TestPipeline::new();
        assert!(pipeline.parallel("Nothing", StageGroup::new()).await);
        assert!(pipeline.events().is_empty());
        assert_eq!(pipeline.failures(), 0);
    }

    #[tokio::test]
    async fn test_deploy_success() {
        let mut pipeline = TestPipeline::new();
        assert!(pipeline.deploy("staging", ok).await);

        let events = pipeline.events();
        assert_eq!(events.len(), 2);
        assert_start_event(
            &events[0],
            "Deploy to staging",
            None,
            Some(&Deployment::new("staging", DeploymentType::Load)),
        );
        assert_end_event(&events[1], "Deploy to staging", false);
    }

    #[tokio::test]
    async fn test_deploy_failure_runs_rollback() {
        let mut pipeline = TestPipeline::new();
        let rollback = |ctx: StageContext| async move {
            ctx.info("restoring previous release");
            anyhow::Ok(())
        };
        let ok = pipeline
            .deploy_with_rollback("staging", FailingHandler::new("health check failed"), rollback)
            .await;
        assert!(!ok);

        let events = pipeline.events();
        assert_eq!(events.len(), 5);
        assert_start_event(
            &events[0],
            "Deploy to staging",
            None,
            Some(&Deployment::new("staging", DeploymentType::Load)),
        );
        assert_end_event(&events[1], "Deploy to staging", true);
        assert_start_event(
            &events[2],
            "Rollback staging",
            None,
            Some(&Deployment::new("staging", DeploymentType::Rollback)),
        );
        assert_log_event(&events[3], "Rollback staging", LogLevel::Info, "restoring previous release");
        assert_end_event(&events[4], "Rollback staging", false);
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_still_fires_callback_once() {
        let mut pipeline = TestPipeline::new();
        let ok = pipeline
            .deploy_with_rollback(
                "staging",
                FailingHandler::new("deploy failed"),
                FailingHandler::new("rollback failed"),
            )
            .await;
        assert!(!ok);
        assert_eq!(pipeline.events().len(), 4);
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test]
    async fn test_successful_deploy_skips_rollback() {
        let recorder = RecordingHandler::new();
        let mut pipeline = TestPipeline::new();
        assert!(pipeline.deploy_with_rollback("staging", ok, recorder.clone()).await);
        assert_eq!(recorder.call_count(), 0);
        assert_eq!(pipeline.events().len(), 2);
    }

    #[tokio::test]
    async fn test_parallel_deploy_tags_members() {
        let mut pipeline = TestPipeline::new();
        let deployments = StageGroup::new().with("eu-west-1", ok).with("us-east-1", ok);
        assert!(pipeline.deploy_parallel("prod", "region", deployments).await);

        let events = pipeline.events();
        assert_eq!(events.len(), 4);
        let mut starts: Vec<_> = events[..2]
            .iter()
            .map(|e| match e {
                PipelineEvent::StartStage(start) => start.clone(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        starts.sort_by(|a, b| a.stage.cmp(&b.stage));
        assert_eq!(starts[0].stage, "Deploy to prod (eu-west-1)");
        assert_eq!(starts[0].parallel.as_deref(), Some("Deploy to prod"));
        assert_eq!(
            starts[0].deployment,
            Some(Deployment::tagged("prod", "region", "eu-west-1", DeploymentType::Load))
        );
        assert_eq!(starts[1].stage, "Deploy to prod (us-east-1)");
    }

    #[tokio::test]
    async fn test_parallel_deploy_failure_without_rollback() {
        let mut pipeline = TestPipeline::new();
        let deployments = StageGroup::new()
            .with("eu-west-1", ok)
            .with("us-east-1", FailingHandler::new("quota exceeded"));
        assert!(!pipeline.deploy_parallel("prod", "region", deployments).await);

        let events = pipeline.events();
        assert_eq!(events.len(), 4);
        assert!(events
            .iter()
            .all(|event| !event.stage().is_some_and(|stage| stage.starts_with("Rollback"))));
        let failed = pipeline.sink().events_for_stage("Deploy to prod (us-east-1)");
        assert_eq!(failed.len(), 2);
        assert_end_event(&failed[1], "Deploy to prod (us-east-1)", true);
        assert_eq!(end_reason(&failed[1]), "Failure: quota exceeded");
        let passed = pipeline.sink().events_for_stage("Deploy to prod (eu-west-1)");
        assert_end_event(&passed[1], "Deploy to prod (eu-west-1)", false);
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test]
    async fn test_parallel_deploy_key_mismatch_aborts() {
        let recorder = RecordingHandler::new();
        let mut pipeline = TestPipeline::new();
        let deployments = StageGroup::new()
            .with("eu-west-1", recorder.clone())
            .with("us-east-1", recorder.clone());
        let rollbacks = StageGroup::new()
            .with("eu-west-1", recorder.clone())
            .with("eu-west-2", recorder.clone());
        let ok = pipeline
            .deploy_parallel_with_rollback("staging", "region", deployments, rollbacks)
            .await;
        assert!(!ok);

        let events = pipeline.events();
        assert_eq!(events.len(), 2);
        assert_start_event(&events[0], "Deploy to staging", None, None);
        assert_end_event(&events[1], "Deploy to staging", true);
        assert_eq!(
            end_reason(&events[1]),
            format!(
                "ConfigurationFailure: {}",
                PipelineError::rollback_key_mismatch(
                    ["eu-west-1", "us-east-1"],
                    ["eu-west-1", "eu-west-2"]
                )
            )
        );
        assert!(end_reason(&events[1]).contains("[eu-west-1, us-east-1]"));
        assert!(end_reason(&events[1]).contains("[eu-west-1, eu-west-2]"));
        assert_eq!(recorder.call_count(), 0);
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_deploy_failure_rolls_back_all_members() {
        let rollbacks_run = RecordingHandler::new();
        let mut pipeline = TestPipeline::new();
        let deployments = StageGroup::new()
            .with("eu-west-1", ok)
            .with("us-east-1", FailingHandler::new("quota exceeded"));
        let rollbacks = StageGroup::new()
            .with("eu-west-1", rollbacks_run.clone())
            .with("us-east-1", rollbacks_run.clone());
        let ok = pipeline
            .deploy_parallel_with_rollback("prod", "region", deployments, rollbacks)
            .await;
        assert!(!ok);

        let mut rolled_back = rollbacks_run.stages();
        rolled_back.sort();
        assert_eq!(
            rolled_back,
            ["Rollback prod (eu-west-1)", "Rollback prod (us-east-1)"]
        );
        assert_eq!(pipeline.failures(), 1);

        let sequence = stage_sequence(&pipeline.events());
        assert_eq!(sequence.len(), 8);
        assert!(sequence[4..6]
            .iter()
            .all(|(kind, stage)| *kind == "StartStageEvent" && stage.starts_with("Rollback prod (")));
    }

    #[tokio::test]
    async fn test_version_propagates_after_success() {
        let mut pipeline = TestPipeline::with_version("1.0.0");
        pipeline
            .stage("Bump", |ctx: StageContext| async move {
                assert_eq!(ctx.version().as_deref(), Some("1.0.0"));
                ctx.set_version("1.1.0");
                anyhow::Ok(())
            })
            .await;
        assert_eq!(pipeline.version(), Some("1.1.0"));

        pipeline
            .stage("Broken bump", |ctx: StageContext| async move {
                ctx.set_version("9.9.9");
                Err::<(), _>(anyhow::anyhow!("tag push rejected"))
            })
            .await;
        assert_eq!(pipeline.version(), Some("1.1.0"));

        pipeline
            .stage("Read", |ctx: StageContext| async move {
                assert_eq!(ctx.version().as_deref(), Some("1.1.0"));
                anyhow::Ok(())
            })
            .await;
        assert_eq!(pipeline.failures(), 1);
    }

    #[tokio::test]
    async fn test_parallel_member_version_written_after_barrier() {
        let mut pipeline = TestPipeline::with_version("1.0.0");
        let group = StageGroup::new()
            .with("bump", |ctx: StageContext| async move {
                ctx.set_version("2.0.0");
                anyhow::Ok(())
            })
            .with("read", |ctx: StageContext| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert_eq!(ctx.version().as_deref(), Some("1.0.0"));
                anyhow::Ok(())
            });
        assert!(pipeline.parallel("Versioning", group).await);
        assert_eq!(pipeline.version(), Some("2.0.0"));
    }

    #[tokio::test]
    async fn test_test_report_attached_to_end() {
        let report = TestReport::new("Unit tests").with_suite(
            TestSuiteResult::new("core", 42)
                .with_test(TestResult::new("parses", 10, TestStatus::Succeeded)),
        );
        let expected = report.clone();
        let mut pipeline = TestPipeline::new();
        pipeline
            .stage("Test", move |ctx: StageContext| {
                let report = report.clone();
                async move {
                    ctx.set_test_report(report)?;
                    anyhow::Ok(())
                }
            })
            .await;
        let end = assert_end_event(&pipeline.events()[1], "Test", false);
        assert_eq!(end.test_results, Some(expected));
    }

    #[tokio::test]
    async fn test_second_test_report_fails_stage() {
        let mut pipeline = TestPipeline::new();
        let ok = pipeline
            .stage("Test", |ctx: StageContext| async move {
                ctx.set_test_report(TestReport::new("first"))?;
                ctx.set_test_report(TestReport::new("second"))?;
                anyhow::Ok(())
            })
            .await;
        assert!(!ok);
        let end = assert_end_event(&pipeline.events()[1], "Test", true);
        assert_eq!(
            end.reason.as_deref(),
            Some("IllegalState: Test report already set for stage 'Test'")
        );
        assert_eq!(end.test_results.map(|r| r.report_type), Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_concealed_secret_masked_in_logs_and_reason() {
        let mut pipeline = TestPipeline::new();
        pipeline.conceal("p4ssw0rd");
        pipeline
            .stage("Login", |ctx: StageContext| async move {
                ctx.info("using p4ssw0rd");
                Err::<(), _>(anyhow::anyhow!("login with p4ssw0rd rejected"))
            })
            .await;
        let events = pipeline.events();
        assert_log_event(&events[1], "Login", LogLevel::Info, "using ******");
        assert_eq!(end_reason(&events[2]), "Error: login with ****** rejected");
    }

    #[tokio::test]
    async fn test_job_updates() {
        let pipeline = TestPipeline::new();
        pipeline.rename("Release 2.0");
        pipeline.link("Docs", "https://docs.example.com", "https://docs.example.com/logo.svg");
        pipeline.add_links(vec![
            Link::new("A", "https://a", "a.svg"),
            Link::new("B", "https://b", "b.svg"),
        ]);

        let events = pipeline.events();
        assert_eq!(events.len(), 3);
        match (&events[0], &events[2]) {
            (PipelineEvent::UpdateJob(rename), PipelineEvent::UpdateJob(links)) => {
                assert_eq!(rename.display_name.as_deref(), Some("Release 2.0"));
                assert_eq!(rename.links, None);
                assert_eq!(links.display_name, None);
                assert_eq!(links.links.as_ref().map(Vec::len), Some(2));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_output_attributed_to_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_local_exec(LocalExecConfig::new(dir.path()));
        let mut pipeline = TestPipeline::with_config(config);
        let ok = pipeline
            .stage("Greet", |ctx: StageContext| async move {
                let result = ctx.exec(["printf", "Hello\\nworld\\n"]).await?;
                assert_eq!(result.status, 0);
                assert_eq!(result.data, "Hello\nworld");
                anyhow::Ok(())
            })
            .await;
        assert!(ok);

        let events = pipeline.events();
        assert_eq!(events.len(), 4);
        assert_log_event(&events[1], "Greet", LogLevel::Info, "Hello");
        assert_log_event(&events[2], "Greet", LogLevel::Info, "world");
        assert_end_event(&events[3], "Greet", false);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_timeout_fails_stage_without_late_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_local_exec(LocalExecConfig::new(dir.path()));
        let mut pipeline = TestPipeline::with_config(config);
        let ok = pipeline
            .stage("Wait", |ctx: StageContext| async move {
                ctx.exec_with_timeout(
                    ["sh", "-c", "echo early; sleep 3; echo late"],
                    Duration::from_secs(1),
                )
                .await?;
                anyhow::Ok(())
            })
            .await;
        assert!(!ok);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let events = pipeline.events();
        assert_eq!(events.len(), 3);
        assert_log_event(&events[1], "Wait", LogLevel::Info, "early");
        let reason = end_reason(&events[2]);
        assert!(reason.starts_with("TimeoutFailure: "), "{reason}");
        assert!(reason.contains("timeout after 1s"), "{reason}");
    }

    #[tokio::test]
    async fn test_handler_helper_in_groups() {
        let mut group = StageGroup::new();
        group.insert("shared", handler(ok));
        let mut pipeline = TestPipeline::new();
        assert!(pipeline.parallel("Shared", group).await);
        assert_eq!(
            stage_sequence(&pipeline.events()),
            [
                ("StartStageEvent", "shared".to_string()),
                ("EndStageEvent", "shared".to_string())
            ]
        );
    }
}
