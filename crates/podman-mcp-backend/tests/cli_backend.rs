//! CLI backend tests using scripts in place of the `podman` binary.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{fake_binary, fake_podman, recorded_calls};
use podman_mcp_backend::cli::find_binary_in;
use podman_mcp_backend::socket::SocketDiscovery;
use podman_mcp_backend::{
    ApiImplementation, BackendError, CliImplementation, Implementation, ImplementationRegistry,
    Locator, Podman, PodmanCli, PodmanClient, PortMappings,
};
use podman_mcp_config::{OutputFormat, PodmanConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn cli(binary: &Path, format: OutputFormat) -> PodmanCli {
    PodmanCli::new(binary, format)
}

/// Discovery inputs that find no socket.
fn no_socket(dir: &Path) -> SocketDiscovery {
    SocketDiscovery {
        container_host: None,
        runtime_dir: None,
        uid: None,
        rootful_socket: dir.join("missing.sock"),
        user_runtime_root: dir.to_path_buf(),
    }
}

// ============================================================================
// Binary discovery
// ============================================================================

#[tokio::test]
async fn test_find_binary_on_search_path() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_podman(tmp.path());

    let found = find_binary_in(tmp.path().as_os_str()).await.unwrap();

    assert_eq!(found, binary);
}

#[tokio::test]
async fn test_find_binary_falls_back_to_exe_name() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(tmp.path(), "podman.exe", "exit 0");

    let found = find_binary_in(tmp.path().as_os_str()).await.unwrap();

    assert_eq!(found, binary);
}

#[tokio::test]
async fn test_find_binary_skips_broken_candidate() {
    let broken = TempDir::new().unwrap();
    let working = TempDir::new().unwrap();
    fake_binary(broken.path(), "podman", "exit 1");
    let binary = fake_podman(working.path());
    let search = std::env::join_paths([broken.path(), working.path()]).unwrap();

    let found = find_binary_in(&search).await.unwrap();

    assert_eq!(found, binary);
}

#[tokio::test]
async fn test_find_binary_missing() {
    let tmp = TempDir::new().unwrap();

    let err = find_binary_in(tmp.path().as_os_str()).await.unwrap_err();

    assert!(matches!(err, BackendError::BinaryNotFound));
}

#[tokio::test]
async fn test_find_binary_ignores_non_executable() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("podman"), "#!/bin/sh\nexit 0\n").unwrap();

    assert!(find_binary_in(tmp.path().as_os_str()).await.is_err());
}

// ============================================================================
// Implementation
// ============================================================================

#[tokio::test]
async fn test_cli_implementation_check_and_initialize() {
    let tmp = TempDir::new().unwrap();
    fake_binary(tmp.path(), "podman", "echo 'NETWORK ID  NAME'");
    let implementation = CliImplementation::with_search_path(tmp.path());

    assert!(implementation.available().await);
    let podman = implementation
        .initialize(&PodmanConfig::default())
        .await
        .unwrap();

    assert_eq!(podman.network_list().await.unwrap(), "NETWORK ID  NAME\n");
}

#[tokio::test]
async fn test_cli_implementation_unavailable_without_binary() {
    let tmp = TempDir::new().unwrap();
    let implementation = CliImplementation::with_search_path(tmp.path());

    let err = implementation.check().await.unwrap_err();

    assert_eq!(err.to_string(), "podman CLI not found");
    assert!(implementation
        .initialize(&PodmanConfig::default())
        .await
        .is_err());
}

// ============================================================================
// Arguments
// ============================================================================

#[tokio::test]
async fn test_list_arguments_follow_output_format() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_podman(tmp.path());

    let text = cli(&binary, OutputFormat::Text);
    text.container_list().await.unwrap();
    text.image_list().await.unwrap();
    text.network_list().await.unwrap();
    text.volume_list().await.unwrap();

    let json = cli(&binary, OutputFormat::Json);
    json.container_list().await.unwrap();
    json.image_list().await.unwrap();
    json.network_list().await.unwrap();
    json.volume_list().await.unwrap();

    assert_eq!(
        recorded_calls(tmp.path()),
        vec![
            "container list -a",
            "images --digests",
            "network ls",
            "volume ls",
            "container list -a --format json",
            "images --digests --format json",
            "network ls --format json",
            "volume ls --format json",
        ]
    );
}

#[tokio::test]
async fn test_container_operation_arguments() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_podman(tmp.path());
    let podman = cli(&binary, OutputFormat::Text);

    podman.container_inspect("web").await.unwrap();
    podman.container_logs("web").await.unwrap();
    podman.container_stop("web").await.unwrap();
    podman.container_remove("web").await.unwrap();
    podman
        .container_run(
            "nginx",
            &PortMappings::from([(8080, 80), (8443, 443)]),
            &["A=1".to_string(), "B=two words".to_string()],
        )
        .await
        .unwrap();
    podman
        .container_run("redis", &PortMappings::new(), &[])
        .await
        .unwrap();

    assert_eq!(
        recorded_calls(tmp.path()),
        vec![
            "inspect web",
            "logs web",
            "container stop web",
            "container rm web",
            "run --rm -d --publish=8080:80 --publish=8443:443 --env A=1 --env B=two words nginx",
            "run --rm -d --publish-all redis",
        ]
    );
}

#[tokio::test]
async fn test_image_build_arguments() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_podman(tmp.path());
    let podman = cli(&binary, OutputFormat::Text);
    let context = tmp.path().join("app");
    std::fs::create_dir(&context).unwrap();
    let containerfile = context.join("Containerfile");

    podman
        .image_build(&containerfile, Some("example/app:dev"))
        .await
        .unwrap();
    podman.image_build(&containerfile, None).await.unwrap();

    assert_eq!(
        recorded_calls(tmp.path()),
        vec![
            format!(
                "build -t example/app:dev -f {} {}",
                containerfile.display(),
                context.display()
            ),
            format!("build -f {} {}", containerfile.display(), context.display()),
        ]
    );
}

// ============================================================================
// Output
// ============================================================================

#[tokio::test]
async fn test_output_combines_stdout_and_stderr() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(
        tmp.path(),
        "podman",
        "echo 'to stdout'\necho 'to stderr' >&2",
    );

    let output = cli(&binary, OutputFormat::Text)
        .container_logs("web")
        .await
        .unwrap();

    assert_eq!(output, "to stdout\nto stderr\n");
}

#[tokio::test]
async fn test_failure_output_passes_through() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(
        tmp.path(),
        "podman",
        "[ \"$1\" = version ] && exit 0\necho 'Error: no container with name or ID \"ghost\" found: no such container' >&2\nexit 125",
    );

    let err = cli(&binary, OutputFormat::Text)
        .container_inspect("ghost")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error: no container with name or ID \"ghost\" found: no such container"
    );
}

#[tokio::test]
async fn test_silent_failure_names_command() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(tmp.path(), "podman", "exit 2");

    let err = cli(&binary, OutputFormat::Text)
        .container_stop("web")
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("podman container failed: "));
}

#[tokio::test]
async fn test_image_pull_short_name_retry() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(
        tmp.path(),
        "podman",
        concat!(
            "if [ \"$3\" = nginx ]; then\n",
            "  echo 'Error: short-name \"nginx\" did not resolve to an alias' >&2\n",
            "  exit 125\n",
            "fi\n",
            "echo \"sha256:4af177a\"",
        ),
    );

    let output = cli(&binary, OutputFormat::Text)
        .image_pull("nginx")
        .await
        .unwrap();

    assert_eq!(
        output,
        "sha256:4af177a\n\ndocker.io/nginx pulled successfully"
    );
    assert_eq!(
        recorded_calls(tmp.path()),
        vec!["image pull nginx", "image pull docker.io/nginx"]
    );
}

#[tokio::test]
async fn test_image_pull_other_failure_not_retried() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(
        tmp.path(),
        "podman",
        "echo 'Error: manifest unknown' >&2\nexit 125",
    );

    let err = cli(&binary, OutputFormat::Text)
        .image_pull("quay.io/nope:1")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Error: manifest unknown");
    assert_eq!(recorded_calls(tmp.path()), vec!["image pull quay.io/nope:1"]);
}

#[tokio::test]
async fn test_container_run_short_name_retry() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(
        tmp.path(),
        "podman",
        concat!(
            "for last; do :; done\n",
            "if [ \"$last\" = nginx ]; then\n",
            "  echo 'Error: short-name resolution enforced' >&2\n",
            "  exit 125\n",
            "fi\n",
            "echo c0ffee",
        ),
    );

    let output = cli(&binary, OutputFormat::Text)
        .container_run("nginx", &PortMappings::new(), &[])
        .await
        .unwrap();

    assert_eq!(output, "c0ffee\n");
    assert_eq!(
        recorded_calls(tmp.path()),
        vec![
            "run --rm -d --publish-all nginx",
            "run --rm -d --publish-all docker.io/nginx",
        ]
    );
}

#[tokio::test]
async fn test_image_push_message() {
    let tmp = TempDir::new().unwrap();
    let binary = fake_binary(tmp.path(), "podman", "printf 'Writing manifest'");

    let output = cli(&binary, OutputFormat::Text)
        .image_push("registry.local/app:1")
        .await
        .unwrap();

    assert_eq!(
        output,
        "Writing manifest\nregistry.local/app:1 pushed successfully"
    );
}

// ============================================================================
// Selection
// ============================================================================

fn registry_without_socket(socket_dir: &Path, bin_dir: &Path) -> ImplementationRegistry {
    let registry = ImplementationRegistry::new();
    registry.register(Arc::new(ApiImplementation::with_locator(
        Locator::Discovery(no_socket(socket_dir)),
    )));
    registry.register(Arc::new(CliImplementation::with_search_path(bin_dir)));
    registry
}

#[tokio::test]
async fn test_auto_detect_falls_back_to_cli() {
    let sockets = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    fake_podman(bin.path());
    let registry = registry_without_socket(sockets.path(), bin.path());

    let client = PodmanClient::new(&registry, &PodmanConfig::default())
        .await
        .unwrap();

    assert_eq!(client.implementation(), "cli");
    client.volume_list().await.unwrap();
    assert_eq!(recorded_calls(bin.path()), vec!["volume ls"]);
}

#[tokio::test]
async fn test_auto_detect_reports_every_candidate() {
    let sockets = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    let registry = registry_without_socket(sockets.path(), bin.path());

    let err = PodmanClient::new(&registry, &PodmanConfig::default())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("api (not available)"), "{message}");
    assert!(message.contains("cli (not available)"), "{message}");
    assert!(message.find("api (").unwrap() < message.find("cli (").unwrap());
}

#[tokio::test]
async fn test_explicit_api_without_socket_fails() {
    let sockets = TempDir::new().unwrap();
    let bin = TempDir::new().unwrap();
    fake_podman(bin.path());
    let registry = registry_without_socket(sockets.path(), bin.path());
    let config = PodmanConfig {
        podman_impl: "api".to_string(),
        ..Default::default()
    };

    let err = PodmanClient::new(&registry, &config).await.unwrap_err();

    match err {
        BackendError::ImplementationNotAvailable { name, reason } => {
            assert_eq!(name, "api");
            assert_eq!(reason, "no podman socket found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_explicit_unknown_implementation() {
    let registry = ImplementationRegistry::with_defaults();
    let config = PodmanConfig {
        podman_impl: "docker".to_string(),
        ..Default::default()
    };

    let err = PodmanClient::new(&registry, &config).await.unwrap_err();

    match err {
        BackendError::UnknownImplementation { name, valid } => {
            assert_eq!(name, "docker");
            assert_eq!(valid, vec!["api".to_string(), "cli".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}
