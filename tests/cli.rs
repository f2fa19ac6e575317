use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Runs the binary from an empty directory with no inherited credentials.
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("healthgenie").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GOOGLE_API_KEY")
        .env_remove("HEALTHGENIE_API_URL")
        .env_remove("HEALTHGENIE_MODEL")
        .env_remove("HEALTHGENIE_TIMEOUT_SECS")
        .env_remove("HEALTHGENIE_TEMPERATURE");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("healthgenie").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: healthgenie <COMMAND>"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("bmi"))
        .stdout(predicate::str::contains("advise"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_serve_help() {
    let mut cmd = Command::cargo_bin("healthgenie").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: healthgenie serve"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--api-key <API_KEY>"))
        .stdout(predicate::str::contains("--timeout-secs <TIMEOUT_SECS>"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("healthgenie").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: healthgenie <COMMAND>"));
}

#[test]
fn test_bmi_metric() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["bmi", "--height", "180", "--weight", "75"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI: 23.1 (Normal weight)"))
        .stdout(predicate::str::contains("Great job!"));
}

#[test]
fn test_bmi_imperial() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args([
            "bmi",
            "--height",
            "66.93",
            "--height-unit",
            "in",
            "--weight",
            "154.32",
            "--weight-unit",
            "lb",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI: 24.2 (Normal weight)"));
}

#[test]
fn test_bmi_zero_height_fails() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["bmi", "--height", "0", "--weight", "70"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input: height"));
}

#[test]
fn test_bmi_degenerate_height_fails() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["bmi", "--height", "1e-160", "--weight", "70"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not give a usable BMI"));
}

#[test]
fn test_serve_fails_when_port_is_taken() {
    let dir = TempDir::new().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();
    let manifest = env!("CARGO_MANIFEST_DIR");
    let templates = format!("{}/templates", manifest);
    let static_dir = format!("{}/static", manifest);

    isolated(&dir)
        .args([
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            port.as_str(),
            "--templates-dir",
            templates.as_str(),
            "--static-dir",
            static_dir.as_str(),
        ])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to bind to address"));
    drop(taken);
}

#[test]
fn test_bmi_rejects_unknown_unit() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["bmi", "--height", "180", "--height-unit", "ft", "--weight", "70"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'ft'"));
}

#[test]
fn test_advise_without_key_fails() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["advise", "--height", "180", "--weight", "75"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("BMI: 23.1"))
        .stderr(predicate::str::contains("Authentication error"));
}

#[test]
fn test_advise_reads_dotenv_and_reports_unreachable_provider() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "GOOGLE_API_KEY=from-dotenv\nHEALTHGENIE_API_URL=http://127.0.0.1:9\nHEALTHGENIE_TIMEOUT_SECS=5\n",
    )
    .unwrap();

    isolated(&dir)
        .args(["advise", "--height", "180", "--weight", "75"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Service unavailable"))
        .stderr(predicate::str::contains("from-dotenv").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_advise_prints_model_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Try swimming twice a week."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        isolated(&dir)
            .args([
                "advise",
                "--height",
                "180",
                "--weight",
                "75",
                "--question",
                "Which sport suits me?",
                "--api-key",
                "cli-key",
                "--api-url",
                uri.as_str(),
            ])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("BMI: 23.1 (Normal weight)"));
    assert!(stdout.contains("Try swimming twice a week."));
}
