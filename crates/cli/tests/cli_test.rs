//! Basic CLI integration tests. None of these reach the network.

#![allow(deprecated)] // Command::cargo_bin deprecated for custom build-dir; still works for default

use assert_cmd::Command;
use pretty_assertions::assert_eq;

fn cli(config_home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cover-resolver").unwrap();
    // Keep the user's real config and credentials out of the tests.
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env_remove("KAKAO_API_KEY")
        .env_remove("NAVER_CLIENT_ID")
        .env_remove("NAVER_CLIENT_SECRET");
    cmd
}

fn stdout_json(out: &assert_cmd::assert::Assert) -> serde_json::Value {
    let stdout = std::str::from_utf8(&out.get_output().stdout).unwrap();
    serde_json::from_str(stdout).expect("--json should output valid JSON")
}

#[test]
fn help_prints_and_exits_success() {
    let home = tempfile::tempdir().unwrap();
    cli(&home).arg("--help").assert().success();
}

#[test]
fn identity_json_is_stable() {
    let home = tempfile::tempdir().unwrap();
    let first = cli(&home)
        .args(["identity", "--title", "데미안", "--author", "헤르만 헤세", "--json"])
        .assert()
        .success();
    let second = cli(&home)
        .args(["identity", "--title", "데미안", "--author", "헤르만 헤세", "--json"])
        .assert()
        .success();

    let v = stdout_json(&first);
    assert_eq!(v, stdout_json(&second));
    assert!(v["palette_index"].as_u64().unwrap() < 10);
    assert!(v["pattern_index"].as_u64().unwrap() < 3);
}

#[test]
fn identity_of_known_input() {
    let home = tempfile::tempdir().unwrap();
    let out = cli(&home)
        .args(["identity", "--title", "a", "--author", "b", "--json"])
        .assert()
        .success();
    let v = stdout_json(&out);
    assert_eq!(v["palette_index"], 5);
    assert_eq!(v["pattern_index"], 0);
    assert_eq!(v["pattern"]["name"], "cross");
}

#[test]
fn identity_matches_rendered_fallback_for_empty_labels() {
    let home = tempfile::tempdir().unwrap();
    let identity = cli(&home)
        .args(["identity", "--title", "", "--author", "", "--json"])
        .assert()
        .success();
    let fallback = cli(&home)
        .args(["fallback", "--title", "", "--author", "", "--json"])
        .assert()
        .success();

    let identity = stdout_json(&identity);
    let cover = stdout_json(&fallback);
    assert_eq!(cover["cover"]["title"], "제목 미정");
    assert_eq!(identity["palette_index"], cover["cover"]["identity"]["palette_index"]);
    assert_eq!(identity["pattern_index"], cover["cover"]["identity"]["pattern_index"]);
}

#[test]
fn fallback_writes_svg() {
    let home = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover.svg");
    cli(&home)
        .args(["fallback", "--title", "Tom & Jerry", "--size", "small", "-o"])
        .arg(&path)
        .assert()
        .success();

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("Tom &amp; Jerry"));
    assert!(svg.contains("작자 미상"));
}

#[test]
fn resolve_without_isbn_keeps_fallback() {
    let home = tempfile::tempdir().unwrap();
    let out = cli(&home)
        .args(["resolve", "--title", "무제", "--json"])
        .assert()
        .success();
    let v = stdout_json(&out);
    assert_eq!(v["result"]["status"], "unresolved");
    assert_eq!(v["attempted"], serde_json::json!([]));
    assert_eq!(v["fallback"]["title"], "무제");
    assert_eq!(v["view"]["phase"], "fallback");
}

#[test]
fn providers_lists_default_order() {
    let home = tempfile::tempdir().unwrap();
    let out = cli(&home).args(["providers", "--json"]).assert().success();
    let v = stdout_json(&out);
    let names: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["google-books-direct", "kakao", "naver", "google-books-api", "aladin"]);
    // No credentials in the environment.
    assert_eq!(v[1]["enabled"], false);
    assert_eq!(v[2]["enabled"], false);
}

#[test]
fn config_show_json_valid() {
    let home = tempfile::tempdir().unwrap();
    let out = cli(&home).args(["config", "show", "--json"]).assert().success();
    let v = stdout_json(&out);
    assert_eq!(v["probe"]["min_width"], 5);
}

#[test]
fn config_show_masks_credentials() {
    let home = tempfile::tempdir().unwrap();
    let out = cli(&home)
        .env("KAKAO_API_KEY", "secret-key")
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let stdout = std::str::from_utf8(&out.get_output().stdout).unwrap();
    assert!(!stdout.contains("secret-key"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    cli(&home)
        .args(["config", "set", "nonsense.key", "1"])
        .assert()
        .failure();
}

#[test]
fn batch_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();
    cli(&home)
        .args(["batch", "/nonexistent/recommendations.json"])
        .assert()
        .failure();
}

#[test]
fn config_set_keeps_existing_settings() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("cover-resolver").join("config.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[credentials]\nkakao_api_key = \"my-real-key\"\n").unwrap();

    cli(&home)
        .args(["config", "set", "probe.min_width", "8"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("my-real-key"));
    assert!(written.contains("min_width = 8"));
}

#[test]
fn config_set_refuses_to_overwrite_broken_file() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("cover-resolver").join("config.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    // custom provider without image_path does not parse
    let broken = "[credentials]\nkakao_api_key = \"my-real-key\"\n\n[[custom_providers]]\nname = \"x\"\nurl = \"https://x/{isbn}\"\n";
    std::fs::write(&path, broken).unwrap();

    let out = cli(&home)
        .args(["config", "set", "probe.min_width", "8"])
        .assert()
        .failure();

    let stderr = std::str::from_utf8(&out.get_output().stderr).unwrap();
    assert!(stderr.contains("Failed to parse config"), "{stderr}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
}
