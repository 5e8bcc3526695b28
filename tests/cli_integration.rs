//! Binary-level smoke tests
//!
//! Runs the compiled `ragline` binary against a mock backend to verify
//! argument handling and the one-shot command paths end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("ragline")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("conversations"))
        .stdout(predicate::str::contains("ingest"));
}

#[test]
fn test_unknown_subcommand_fails() {
    Command::cargo_bin("ragline")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

#[tokio::test]
async fn test_health_command_reports_online() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("ragline")
            .unwrap()
            .args(["--host", &uri, "health"])
            .assert()
            .success()
            .stdout(predicate::str::contains("online"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_conversations_list_renders_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "title": "Ingest questions", "updated_at": "2025-06-01T10:00:00Z"}
        ])))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("ragline")
            .unwrap()
            .args(["--host", &uri, "conversations", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ingest questions"));
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_ask_prints_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"conversation_id\":\"c1\",\"response\":\"The ingest flow walks the repo.\"}\n",
            "application/json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        let settings_dir = tempfile::tempdir().unwrap();
        Command::cargo_bin("ragline")
            .unwrap()
            .env(
                "RAGLINE_SETTINGS_PATH",
                settings_dir.path().join("settings.json"),
            )
            .args(["--host", &uri, "ask", "how does ingest work?"])
            .assert()
            .success()
            .stdout(predicate::str::contains("The ingest flow walks the repo."));
    })
    .await
    .unwrap();
}
