use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs the binary in `cwd` with a private config home and fixed output paths.
fn tcr_command(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tcr-analyst"));
    cmd.current_dir(cwd)
        .env("XDG_CONFIG_HOME", cwd.join("xdg"))
        .env("TCR_DATA_FILE", "/srv/tcr/analysis_data.txt")
        .env("TCR_OUTPUT_FILE", "/srv/tcr/results.csv")
        .env_remove("TCR_PROMPTS_DIR")
        .env_remove("TCR_DEFAULT_PATTERN")
        .env_remove("LOG_FILE");
    cmd
}

fn run_tcr(cwd: &Path, args: &[&str]) -> std::process::Output {
    tcr_command(cwd)
        .args(args)
        .output()
        .expect("failed to run tcr-analyst binary")
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    for name in ["2XYZ.pdb", "1ABC.pdb", "notes.txt"] {
        std::fs::write(data.join(name), "ATOM\n").unwrap();
    }
    dir
}

#[test]
fn cli_help_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_tcr(dir.path(), &["--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("single"));
    assert!(stdout.contains("batch"));
    assert!(stdout.contains("serve"));
}

#[test]
fn cli_single_prints_instructions() {
    let dir = fixture();
    let file = dir.path().join("data/1ABC.pdb");
    let out = run_tcr(dir.path(), &["single", file.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("**PDB ID**: 1ABC"));
    assert!(stdout.contains("/srv/tcr/analysis_data.txt"));
    assert!(stdout.trim_end().ends_with("Start enhanced analysis!"));
}

#[test]
fn cli_single_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_tcr(dir.path(), &["single", "/data/missing.pdb"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("tcr-analyst: path does not exist: /data/missing.pdb"));
}

#[test]
fn cli_batch_json_has_description_and_text() {
    let dir = fixture();
    let folder = dir.path().join("data");
    let out = run_tcr(dir.path(), &["--json", "batch", folder.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        v["description"],
        format!("Enhanced batch analysis - 2 files from {}", folder.display())
    );
    assert!(v["text"].as_str().unwrap().contains("  1. 1ABC.pdb\n  2. 2XYZ.pdb"));
}

#[test]
fn cli_batch_without_matches_fails() {
    let dir = fixture();
    let folder = dir.path().join("data");
    let out = run_tcr(
        dir.path(),
        &["batch", folder.to_str().unwrap(), "--pattern", "*.cif"],
    );
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no matching files found: *.cif"));
}

#[test]
fn cli_default_pattern_from_dotenv() {
    let dir = fixture();
    std::fs::write(dir.path().join("data/3DEF.cif"), "ATOM\n").unwrap();
    std::fs::write(dir.path().join(".env"), "TCR_DEFAULT_PATTERN=*.cif\n").unwrap();
    let folder = dir.path().join("data");
    let out = run_tcr(dir.path(), &["batch", folder.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("(1 files)"));
    assert!(stdout.contains("  1. 3DEF.cif"));
}

#[test]
fn cli_prompts_json_lists_both() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_tcr(dir.path(), &["--json", "prompts"]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["single_analysis", "batch_analysis"]);
}

#[test]
fn cli_serve_answers_on_stdout_until_eof() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = tcr_command(dir.path())
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut next_response = || {
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        serde_json::from_str::<serde_json::Value>(&line).unwrap()
    };

    writeln!(
        stdin,
        r#"{{"jsonrpc":"2.0","id":1,"method":"initialize","params":{{"protocolVersion":"2025-06-18","capabilities":{{}},"clientInfo":{{"name":"cli-test","version":"1"}}}}}}"#
    )
    .unwrap();
    let init = next_response();
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "enhanced-tcr-analyzer");

    writeln!(stdin, r#"{{"jsonrpc":"2.0","method":"notifications/initialized"}}"#).unwrap();
    writeln!(stdin, r#"{{"jsonrpc":"2.0","id":2,"method":"tools/list"}}"#).unwrap();
    let tools = next_response();
    assert_eq!(tools["id"], 2);
    assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 2);

    drop(stdin);
    let status = child.wait().unwrap();
    assert!(status.success());
}
