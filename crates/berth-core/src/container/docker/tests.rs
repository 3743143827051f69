//! Docker adapter tests

use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::plugins::{HealthCheckSpec, PluginManifest};

type Calls = Arc<Mutex<Vec<Vec<String>>>>;

/// Mock runner answering with `respond` and recording every invocation
fn scripted<F>(respond: F) -> (DockerContainerAdapter<MockDockerRunner>, Calls)
where
    F: Fn(&[String]) -> CommandOutput + Send + Sync + 'static,
{
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();

    let mut runner = MockDockerRunner::new();
    runner.expect_run().returning(move |args| {
        let output = respond(&args);
        recorded.lock().push(args);
        Ok(output)
    });

    (
        DockerContainerAdapter::with_runner(runner),
        calls,
    )
}

fn command(calls: &Calls, index: usize) -> Vec<String> {
    calls.lock()[index].clone()
}

fn config() -> ContainerConfig {
    let mut manifest = PluginManifest::new("crm", "1.0.0");
    manifest.runtime.ports = vec![8080];
    manifest.runtime.health_check = Some(HealthCheckSpec {
        command: "curl -f http://localhost:8080/health".to_string(),
        interval_secs: 5,
        retries: 3,
    });
    ContainerConfig::from_manifest(&manifest, &ContainerSettings::default())
}

#[tokio::test]
async fn test_start_creates_missing_container() {
    let (adapter, calls) = scripted(|args| match args[0].as_str() {
        "inspect" => CommandOutput::failed("Error: No such container: berth-plugin-crm"),
        "image" => CommandOutput::failed("Error: No such image: plugin-crm:1.0.0"),
        _ => CommandOutput::ok(""),
    });

    adapter.start("crm", &config()).await.unwrap();

    let calls = calls.lock().clone();
    let verbs: Vec<&str> = calls.iter().map(|c| c[0].as_str()).collect();
    assert_eq!(verbs, vec!["network", "inspect", "image", "pull", "run"]);

    let run = calls.last().unwrap();
    assert!(run.windows(2).any(|w| w[0] == "--name" && w[1] == "berth-plugin-crm"));
    assert!(run.windows(2).any(|w| w[0] == "--network" && w[1] == "berth-plugins"));
    assert!(run.windows(2).any(|w| w[0] == "--label" && w[1] == "berth.plugin=crm"));
    assert!(run.windows(2).any(|w| w[0] == "-e" && w[1] == "PLUGIN_ID=crm"));
    assert!(run.windows(2).any(|w| w[0] == "--expose" && w[1] == "8080"));
    assert!(run.iter().any(|a| a == "--health-cmd"));
    assert_eq!(run.last().unwrap(), "plugin-crm:1.0.0");
}

#[tokio::test]
async fn test_start_is_noop_for_running_container() {
    let (adapter, calls) = scripted(|args| match args[0].as_str() {
        "inspect" => CommandOutput::ok(r#"{"Status":"running","Running":true}"#),
        _ => CommandOutput::ok(""),
    });

    adapter.start("crm", &config()).await.unwrap();
    assert_eq!(calls.lock().len(), 2);
}

#[tokio::test]
async fn test_start_restarts_stopped_container() {
    let (adapter, calls) = scripted(|args| match args[0].as_str() {
        "inspect" => CommandOutput::ok(r#"{"Status":"exited","Running":false}"#),
        _ => CommandOutput::ok(""),
    });

    adapter.start("crm", &config()).await.unwrap();
    assert_eq!(command(&calls, 2), vec!["start", "berth-plugin-crm"]);
}

#[tokio::test]
async fn test_start_creates_network_when_missing() {
    let (adapter, calls) = scripted(|args| match (args[0].as_str(), args[1].as_str()) {
        ("network", "inspect") => CommandOutput::failed("Error: No such network: berth-plugins"),
        ("inspect", _) => CommandOutput::ok(r#"{"Status":"running","Running":true}"#),
        _ => CommandOutput::ok(""),
    });

    adapter.start("crm", &config()).await.unwrap();
    assert_eq!(
        command(&calls, 1),
        vec!["network", "create", "--driver", "bridge", "berth-plugins"]
    );
}

#[tokio::test]
async fn test_container_joins_the_network_it_ensured() {
    let (adapter, calls) = scripted(|args| match (args[0].as_str(), args[1].as_str()) {
        ("network", "inspect") => CommandOutput::failed("Error: No such network: tenant-net"),
        ("inspect", _) => CommandOutput::failed("Error: No such container: berth-plugin-crm"),
        _ => CommandOutput::ok(""),
    });
    let mut config = config();
    config.network = "tenant-net".to_string();

    adapter.start("crm", &config).await.unwrap();

    assert_eq!(command(&calls, 0), vec!["network", "inspect", "tenant-net"]);
    assert_eq!(
        command(&calls, 1),
        vec!["network", "create", "--driver", "bridge", "tenant-net"]
    );
    let calls = calls.lock().clone();
    let run = calls.last().unwrap();
    assert_eq!(run[0], "run");
    assert!(run.windows(2).any(|w| w[0] == "--network" && w[1] == "tenant-net"));
}

#[tokio::test]
async fn test_empty_network_skips_network_setup() {
    let (adapter, calls) = scripted(|args| match args[0].as_str() {
        "inspect" => CommandOutput::failed("Error: No such container: berth-plugin-crm"),
        _ => CommandOutput::ok(""),
    });
    let mut config = config();
    config.network = String::new();

    adapter.start("crm", &config).await.unwrap();

    let calls = calls.lock().clone();
    assert!(calls.iter().all(|c| c[0] != "network"));
    assert!(!calls.last().unwrap().iter().any(|a| a == "--network"));
}

#[tokio::test]
async fn test_run_failure_is_container_error() {
    let (adapter, _calls) = scripted(|args| match args[0].as_str() {
        "inspect" => CommandOutput::failed("Error: No such object: berth-plugin-crm"),
        "run" => CommandOutput::failed("port is already allocated"),
        _ => CommandOutput::ok(""),
    });

    let err = adapter.start("crm", &config()).await.unwrap_err();
    match err {
        BerthError::ContainerRuntime {
            operation,
            plugin_id,
            message,
        } => {
            assert_eq!(operation, "start");
            assert_eq!(plugin_id, "crm");
            assert!(message.contains("already allocated"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stop_and_remove_tolerate_missing_container() {
    let (adapter, _calls) =
        scripted(|_| CommandOutput::failed("Error: No such container: berth-plugin-crm"));

    adapter.stop("crm").await.unwrap();
    adapter.remove("crm").await.unwrap();
}

#[tokio::test]
async fn test_stop_reports_daemon_failure() {
    let (adapter, _calls) =
        scripted(|_| CommandOutput::failed("Cannot connect to the Docker daemon"));

    let err = adapter.stop("crm").await.unwrap_err();
    assert!(err.is_container_error());
}

#[tokio::test]
async fn test_health_maps_runtime_state() {
    let cases = [
        (
            r#"{"Running":true,"Health":{"Status":"healthy"}}"#,
            HealthStatus::Healthy,
        ),
        (
            r#"{"Running":true,"Health":{"Status":"starting"}}"#,
            HealthStatus::Starting,
        ),
        (
            r#"{"Running":true,"Health":{"Status":"unhealthy"}}"#,
            HealthStatus::Unhealthy,
        ),
        (r#"{"Running":true}"#, HealthStatus::Healthy),
        (r#"{"Running":false,"Status":"exited"}"#, HealthStatus::Unhealthy),
    ];

    for (state, expected) in cases {
        let (adapter, _calls) = scripted(move |_| CommandOutput::ok(state));
        assert_eq!(adapter.health("crm").await, expected, "state {}", state);
    }
}

#[tokio::test]
async fn test_health_is_unhealthy_when_inspect_fails() {
    let (adapter, _calls) = scripted(|_| CommandOutput::failed("permission denied"));
    assert_eq!(adapter.health("crm").await, HealthStatus::Unhealthy);

    let mut runner = MockDockerRunner::new();
    runner
        .expect_run()
        .returning(|_| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "docker")));
    let adapter = DockerContainerAdapter::with_runner(runner);
    assert_eq!(adapter.health("crm").await, HealthStatus::Unhealthy);
}
