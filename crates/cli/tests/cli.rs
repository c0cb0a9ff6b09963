use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn vote(id: usize, date: &str, result: &str) -> Value {
    serde_json::json!({
        "id": id.to_string(),
        "data": date,
        "resultado": result,
        "detalhe": "A Favor: <I>PS</I>, <I>L</I><BR>Contra: <I>CH</I>"
    })
}

fn write_feed(dir: &TempDir, votes: Vec<Value>) -> String {
    let feed = serde_json::json!([{
        "IniNr": "1",
        "IniTitulo": "Regime jurídico da habitação",
        "IniDescTipo": "Projeto de Lei",
        "IniLinkTexto": "https://app.parlamento.pt/doc/1",
        "IniAutorGruposParlamentares": {"GP": "L"},
        "IniEventos": {"Fase": "Votação na generalidade", "Votacao": votes}
    }]);

    let path = dir.path().join("feed.json");
    fs::write(&path, feed.to_string()).expect("write feed");
    format!("file://{}", path.display())
}

fn read_state(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("read state");
    serde_json::from_str(&content).expect("valid json")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[source.legislatures]"));
    assert!(content.contains("dry_run = true"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine").expect("write config");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    assert_eq!(fs::read_to_string(&config_path).expect("read"), "# mine");
}

#[test]
fn dry_run_records_new_votes_as_published() {
    let dir = TempDir::new().expect("temp dir");
    let feed = write_feed(
        &dir,
        vec![
            vote(2, "2024-05-02", "Rejeitado"),
            vote(1, "2024-05-01", "Aprovado"),
        ],
    );
    let state_path = dir.path().join("state.json");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .env_remove("MASTODON_ACCESS_TOKEN")
        .args(["run", "--dry-run", "--legislature", "XVI", "--state-path"])
        .arg(&state_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("[DRY RUN]"));

    assert_eq!(
        read_state(&dir.path().join("state.XVI.json")),
        serde_json::json!({"1": "published", "2": "published"})
    );
}

#[test]
fn outbox_receives_thread_and_replies() {
    let dir = TempDir::new().expect("temp dir");
    let feed = write_feed(&dir, vec![vote(7, "2024-05-01", "Aprovado")]);
    let outbox = dir.path().join("outbox.jsonl");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .args(["run", "--outbox"])
        .arg(&outbox)
        .arg("--state-path")
        .arg(dir.path().join("state.json"))
        .assert()
        .success();

    let lines: Vec<Value> = fs::read_to_string(&outbox)
        .expect("read outbox")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "thread");
    assert_eq!(lines[1]["kind"], "reply");
    assert_eq!(lines[1]["idempotency_key"], "7");
}

#[test]
fn too_many_new_votes_aborts_without_state() {
    let dir = TempDir::new().expect("temp dir");
    let votes = (1..=101).map(|id| vote(id, "2024-05-01", "Aprovado")).collect();
    let feed = write_feed(&dir, votes);
    let state_path = dir.path().join("state.json");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .args(["run", "--dry-run", "--state-path"])
        .arg(&state_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("101 new votes"));

    assert!(!dir.path().join("state.XVI.json").exists());
}

#[test]
fn skip_all_marks_votes_without_posting() {
    let dir = TempDir::new().expect("temp dir");
    let feed = write_feed(&dir, vec![vote(3, "2024-05-01", "Aprovado")]);
    let state_path = dir.path().join("state.json");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .args(["run", "--dry-run", "--skip-all", "--state-path"])
        .arg(&state_path)
        .assert()
        .success();

    assert_eq!(
        read_state(&dir.path().join("state.XVI.json")),
        serde_json::json!({"3": "skipped"})
    );
}

#[test]
fn run_fails_for_unconfigured_legislature() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .args(["run", "--dry-run", "--legislature", "XIV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feed configured for legislature XIV"));
}

#[test]
fn render_outputs_valid_json() {
    let dir = TempDir::new().expect("temp dir");
    let feed = write_feed(
        &dir,
        vec![
            vote(1, "2024-05-01", "Aprovado"),
            vote(2, "2024-05-03", "Rejeitado"),
        ],
    );

    let mut cmd = cargo_bin_cmd!("vote-herald");
    let output = cmd
        .current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .args(["render", "--limit", "1", "--json"])
        .output()
        .expect("run render");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let rendered = value.as_array().expect("array");
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0]["id"], "2");
    assert!(
        rendered[0]["text"]
            .as_str()
            .expect("text")
            .contains("🔴 Rejeitado")
    );
    assert!(!dir.path().join("state.XVI.json").exists());
}

#[test]
fn doctor_reports_json() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    let output = cmd
        .current_dir(dir.path())
        .env_remove("MASTODON_ACCESS_TOKEN")
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["config"]["status"], "ok");
    assert_eq!(value["state"]["status"], "warn");
    assert_eq!(value["overall"], "warn");
}

#[test]
fn cutoff_date_applies_with_override_from_environment() {
    let dir = TempDir::new().expect("temp dir");
    let mut votes: Vec<Value> = (1..=100).map(|id| vote(id, "2024-05-01", "Aprovado")).collect();
    votes.push(vote(101, "2024-05-02", "Rejeitado"));
    let feed = write_feed(&dir, votes);

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .env("VOTE_HERALD__GENERAL__OVERRIDE_TOO_MANY_NEW_VOTES", "true")
        .args(["run", "--dry-run", "--cutoff-date", "2024-05-01", "--state-path"])
        .arg(dir.path().join("state.json"))
        .assert()
        .success();

    let state = read_state(&dir.path().join("state.XVI.json"));
    assert_eq!(state["1"], "skipped");
    assert_eq!(state["100"], "skipped");
    assert_eq!(state["101"], "published");
}

#[test]
fn doctor_warns_when_override_has_no_cutoff() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    let output = cmd
        .current_dir(dir.path())
        .env("VOTE_HERALD__GENERAL__OVERRIDE_TOO_MANY_NEW_VOTES", "true")
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["config"]["status"], "warn");
    assert!(
        value["config"]["message"]
            .as_str()
            .expect("message")
            .contains("override_cutoff_date")
    );
}

#[test]
fn doctor_checks_the_legislature_state_file() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("state.XVI.json"), r#"{"1":"published"}"#).expect("seed state");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    let output = cmd
        .current_dir(dir.path())
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["state"]["status"], "ok");
    assert!(
        value["state"]["message"]
            .as_str()
            .expect("message")
            .contains("state.XVI.json")
    );
}

#[test]
fn log_level_from_config_file_is_honoured() {
    let dir = TempDir::new().expect("temp dir");
    let feed = write_feed(&dir, vec![vote(1, "2024-05-01", "Aprovado")]);
    let config_path = dir.path().join("quiet.toml");
    fs::write(&config_path, "[general]\nlog_level = \"warn\"\n").expect("write config");

    let mut cmd = cargo_bin_cmd!("vote-herald");
    cmd.current_dir(dir.path())
        .env("VOTE_HERALD__SOURCE__LEGISLATURES__XVI", &feed)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config_path)
        .args(["run", "--dry-run", "--state-path"])
        .arg(dir.path().join("state.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("[DRY RUN]").not());

    assert_eq!(
        read_state(&dir.path().join("state.XVI.json")),
        serde_json::json!({"1": "published"})
    );
}
