#![cfg(unix)]

mod common;

use common::{parse_json, stdout_text, Sandbox};

const APP: [&str; 4] = ["--app-name", "Hello", "--bundle", "com.example"];

#[test]
fn verify_reports_the_engine_version() {
    let sandbox = Sandbox::healthy();
    let assert = sandbox.bx().args(["--json", "verify"]).assert().success();

    let payload = parse_json(&assert);
    assert_eq!(payload["command"], "verify");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["version"], "24.0.7, build afdd53b");
    assert_eq!(payload["details"]["warnings"], serde_json::json!([]));
}

#[test]
fn verify_flags_an_unreachable_daemon() {
    let sandbox = Sandbox::daemon_down();
    let assert = sandbox.bx().args(["--json", "verify"]).assert().code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["code"], "BX104");
}

#[test]
fn verify_flags_a_missing_engine() {
    let sandbox = Sandbox::healthy();
    let missing = sandbox.temp.path().join("no-such-docker");
    let assert = sandbox
        .bx()
        .env("BX_CONTAINER_ENGINE", &missing)
        .args(["--json", "verify"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["code"], "BX101");
}

#[test]
fn captured_container_run_prints_the_engine_invocation() {
    let sandbox = Sandbox::healthy();
    let project = sandbox.project();
    let assert = sandbox
        .bx()
        .args(["run"])
        .args(APP)
        .arg("--base")
        .arg(&project)
        .args(["--capture", "--env", "MAGIC=True", "--", "echo", "hi"])
        .assert()
        .success();

    let text = stdout_text(&assert);
    assert!(text.starts_with("run "), "unexpected argv: {text}");
    assert!(text.contains("--rm"), "unexpected argv: {text}");
    assert!(text.contains("--env MAGIC=True"), "unexpected argv: {text}");
    assert!(
        text.contains("bx/com.example.hello:py3.12 echo hi"),
        "unexpected argv: {text}"
    );
}

#[test]
fn local_run_skips_the_engine() {
    let sandbox = Sandbox::daemon_down();
    let assert = sandbox
        .bx()
        .args(["run"])
        .args(APP)
        .args(["--local", "--capture", "--", "echo", "from-host"])
        .assert()
        .success();

    assert_eq!(stdout_text(&assert), "from-host\n");
}

#[test]
fn single_verbose_flag_echoes_the_subprocess() {
    let sandbox = Sandbox::healthy();
    let assert = sandbox
        .bx()
        .args(["-v", "run"])
        .args(APP)
        .args(["--local", "--capture", "--", "echo", "traced"])
        .assert()
        .success();

    let text = stdout_text(&assert);
    assert!(text.contains(">>> Running Command:"), "no echo: {text}");
    assert!(text.contains(">>>     echo traced"), "no echo: {text}");
    assert!(text.ends_with("traced\n"), "unexpected output: {text}");
}

#[test]
fn fetch_tool_works_without_an_interpreter() {
    let sandbox = Sandbox::healthy();
    let missing = sandbox.temp.path().join("no-such-python");
    let assert = sandbox
        .bx()
        .env("BX_PYTHON", &missing)
        .args(["--json", "fetch-tool", "rcedit", "--no-install"])
        .assert()
        .code(1);

    assert_eq!(parse_json(&assert)["details"]["code"], "BX107");
}

#[test]
fn container_run_without_an_interpreter_is_a_user_error() {
    let sandbox = Sandbox::healthy();
    let missing = sandbox.temp.path().join("no-such-python");
    let assert = sandbox
        .bx()
        .env("BX_PYTHON", &missing)
        .args(["--json", "run"])
        .args(APP)
        .args(["--", "echo", "hi"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["code"], "BX109");
}

#[test]
fn local_run_failure_maps_to_failure_exit() {
    let sandbox = Sandbox::healthy();
    let assert = sandbox
        .bx()
        .args(["--json", "run"])
        .args(APP)
        .args(["--local", "--", "sh", "-c", "exit 3"])
        .assert()
        .code(2);

    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "failure");
    assert_eq!(payload["details"]["exit_code"], 3);
    assert_eq!(payload["details"]["context"], "local");
}

#[test]
fn fetch_tool_without_install_reports_missing_tool() {
    let sandbox = Sandbox::healthy();
    let assert = sandbox
        .bx()
        .args(["--json", "fetch-tool", "rcedit", "--no-install"])
        .assert()
        .code(1);

    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["code"], "BX107");
    assert!(payload["message"]
        .as_str()
        .is_some_and(|message| message.contains("RCEdit")));
}

#[test]
fn run_requires_a_command() {
    let sandbox = Sandbox::healthy();
    sandbox.bx().args(["run"]).args(APP).assert().failure();
}
