//! Integration tests for the `prepdesk` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run
//! without a network; the check-in and session tests talk to a wiremock
//! API passed in with `--api-url`.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use chrono::{Local, TimeDelta};
use jsonwebtoken::{EncodingKey, Header, encode};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const PHONE: &str = "9812345678";

/// Build a [`Command`] for the `prepdesk` binary with env isolation.
///
/// Clears all `PREPDESK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn prepdesk_cmd() -> assert_cmd::Command {
    isolated_cmd(Path::new("/tmp/prepdesk-cli-test-nonexistent"))
}

fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("prepdesk");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env("NO_COLOR", "1")
        .env_remove("PREPDESK_PROFILE")
        .env_remove("PREPDESK_API_URL")
        .env_remove("PREPDESK_INTERNAL_KEY")
        .env_remove("PREPDESK_OUTPUT")
        .env_remove("PREPDESK_TIMEOUT")
        .env_remove("PREPDESK_EMAIL")
        .env_remove("PREPDESK_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a prepared command off the async runtime and collect its output.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn qr_token(date: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "date": date, "exp": exp }),
        &EncodingKey::from_secret(b"front-desk"),
    )
    .unwrap()
}

fn checkin_args(server: &MockServer) -> Vec<String> {
    vec![
        "--api-url".into(),
        format!("{}/api", server.uri()),
        "--internal-key".into(),
        "desk-key".into(),
        "--color".into(),
        "never".into(),
        "checkin".into(),
        "--no-input".into(),
    ]
}

fn at_desk() -> [&'static str; 4] {
    ["--latitude", "27.7172", "--longitude", "85.324"]
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = prepdesk_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    prepdesk_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("attendance")
            .and(predicate::str::contains("checkin"))
            .and(predicate::str::contains("whoami")),
    );
}

#[test]
fn test_version_flag() {
    prepdesk_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("prepdesk"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    prepdesk_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    prepdesk_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_latitude_requires_longitude() {
    let output = prepdesk_cmd()
        .args(["checkin", "--latitude", "27.7"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--longitude"));
}

#[test]
fn test_url_conflicts_with_token() {
    let output = prepdesk_cmd()
        .args([
            "checkin",
            "--url",
            "https://desk.example.com/attendance",
            "--token",
            "abc",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_checkin_without_api_url() {
    prepdesk_cmd()
        .args(["checkin", "--phone", PHONE, "--no-input"])
        .args(at_desk())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No API URL configured"));
}

#[test]
fn test_unknown_profile_is_reported() {
    prepdesk_cmd()
        .args(["--profile", "lab", "whoami"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Profile 'lab' not found"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // `config show` renders the default config when no file exists.
    prepdesk_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_malformed_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config/prepdesk");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[profiles.desk\napi_url = \"https://desk.example.com/api\"\n",
    )
    .unwrap();

    for args in [vec!["whoami"], vec!["config", "show"]] {
        let output = isolated_cmd(home.path()).args(&args).output().unwrap();
        let text = combined_output(&output);
        assert!(!output.status.success(), "{args:?}: {text}");
        assert!(!text.contains("No API URL configured"), "{args:?}: {text}");
        assert_eq!(output.status.code(), Some(1), "{args:?}: {text}");
    }
}

#[test]
fn test_config_path() {
    prepdesk_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_masks_internal_key() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config/prepdesk");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"
default_profile = "desk"

[profiles.desk]
api_url = "https://desk.example.com/api"
internal_key = "super-secret"
latitude = 27.7
longitude = 85.3
"#,
    )
    .unwrap();

    let output = isolated_cmd(home.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("[profiles.desk]"), "{text}");
    assert!(text.contains("****"), "{text}");
    assert!(!text.contains("super-secret"), "{text}");
}

// ── Token inspection ────────────────────────────────────────────────

#[test]
fn test_token_inspect_static_link() {
    prepdesk_cmd()
        .args([
            "-o",
            "json",
            "token",
            "inspect",
            "https://desk.example.com/attendance",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "static""#));
}

#[test]
fn test_token_inspect_todays_token() {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let exp = (Local::now() + TimeDelta::hours(1)).timestamp();
    prepdesk_cmd()
        .args(["-o", "json", "token", "inspect", &qr_token(&today, exp)])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""status": "valid""#)
                .and(predicate::str::contains(&today)),
        );
}

#[test]
fn test_token_inspect_stale_token() {
    let exp = (Local::now() + TimeDelta::hours(1)).timestamp();
    prepdesk_cmd()
        .args(["token", "inspect", &qr_token("2000-01-01", exp)])
        .assert()
        .code(9)
        .stdout(predicate::str::contains("not-for-today"));
}

#[test]
fn test_token_inspect_garbage() {
    prepdesk_cmd()
        .args(["-o", "plain", "token", "inspect", "not-a-jwt"])
        .assert()
        .code(9)
        .stdout(predicate::str::contains("invalid-format"));
}

// ── Check-in ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_static_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .and(header("x-internal-access-key", "desk-key"))
        .and(body_json(json!({
            "phoneNumber": PHONE,
            "location": { "latitude": 27.7172, "longitude": 85.324 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "studentName": "Asha Rai"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(["-o", "json"])
        .args(checkin_args(&server))
        .args(["--phone", &format!("  {PHONE} ")])
        .args(at_desk());
    let output = run(cmd).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["message"], "You are attended today");
    assert_eq!(body["student_name"], "Asha Rai");
    assert_eq!(body["already_marked"], false);
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("You are attended today"),
        "{text}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_sends_dynamic_token_from_link() {
    let server = MockServer::start().await;
    let today = Local::now().format("%Y-%m-%d").to_string();
    let token = qr_token(&today, (Local::now() + TimeDelta::hours(1)).timestamp());

    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .and(body_json(json!({
            "token": token,
            "phoneNumber": PHONE,
            "location": { "latitude": 27.7172, "longitude": 85.324 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "alreadyMarked": true,
            "message": "Attendance already marked for today"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(["-o", "plain"])
        .args(checkin_args(&server))
        .args([
            "--url",
            &format!("https://desk.example.com/attendance?token={token}"),
            "--phone",
            PHONE,
        ])
        .args(at_desk());
    let output = run(cmd).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("Attendance already marked for today"),
        "{text}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_unknown_student() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(checkin_args(&server))
        .args(["--phone", PHONE])
        .args(at_desk());
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Student does not exist"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_expired_link_never_submits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let exp = (Local::now() - TimeDelta::minutes(5)).timestamp();
    let today = Local::now().format("%Y-%m-%d").to_string();
    let mut cmd = prepdesk_cmd();
    cmd.args(checkin_args(&server))
        .args(["--token", &qr_token(&today, exp), "--phone", PHONE])
        .args(at_desk());
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("QR code has expired"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_without_phone_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(checkin_args(&server)).args(at_desk());
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--phone"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_without_location_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(checkin_args(&server)).args(["--phone", PHONE]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(10));
    assert!(combined_output(&output).contains("Geolocation is not supported"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_checkin_uses_geo_ip_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "lat": 27.7172, "lon": 85.324 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/mark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = prepdesk_cmd();
    cmd.args(["-o", "plain"])
        .args(checkin_args(&server))
        .args([
            "--phone",
            PHONE,
            "--geolocation-url",
            &format!("{}/geo", server.uri()),
        ]);
    let output = run(cmd).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("You are attended today"));

    // The internal-access key goes to the API only, never to the lookup host.
    let requests = server.received_requests().await.unwrap();
    let key_sent_to = |p: &str| {
        requests
            .iter()
            .find(|r| r.url.path() == p)
            .map(|r| r.headers.contains_key("x-internal-access-key"))
    };
    assert_eq!(key_sent_to("/geo"), Some(false));
    assert_eq!(key_sent_to("/api/attendance/mark"), Some(true));
}

// ── Session ─────────────────────────────────────────────────────────

#[test]
fn test_whoami_when_signed_out() {
    let home = tempfile::tempdir().unwrap();
    isolated_cmd(home.path())
        .args(["--api-url", "http://127.0.0.1:9/api", "whoami"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not signed in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_whoami_reuses_saved_session() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    let api_url = format!("{}/api", server.uri());

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "desk@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "user": { "name": "Front Desk", "email": "desk@example.com", "role": "admin" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "name": "Front Desk", "email": "desk@example.com", "role": "admin" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut login = isolated_cmd(home.path());
    login
        .env("PREPDESK_PASSWORD", "pw")
        .args(["--api-url", &api_url, "--internal-key", "k"])
        .args(["login", "--email", "desk@example.com"]);
    let output = run(login).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let mut whoami = isolated_cmd(home.path());
    whoami.args(["--api-url", &api_url, "--internal-key", "k", "-o", "plain", "whoami"]);
    let output = run(whoami).await;

    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("desk@example.com"),
        "{text}"
    );
}
