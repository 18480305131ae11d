#![cfg(unix)]

use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Result of one `br` invocation
struct RunOutput {
    code: i32,
    stdout: String,
    stderr: String,
}

/// Helper struct to manage test environment
struct TestEnv {
    _temp_dir: TempDir,
    work_dir: PathBuf,
    binary_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let work_dir = temp_dir.path().to_path_buf();

        Self {
            _temp_dir: temp_dir,
            work_dir,
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_br")),
        }
    }

    /// A project with shell-script tasks under `tutorials/`.
    fn with_config(timeout_secs: u64) -> Self {
        let env = Self::new();
        env.write(
            "batchrun.toml",
            &format!(
                "root = \"tutorials\"\nextension = \"sh\"\ntimeout_secs = {timeout_secs}\ninterpreter = [\"sh\"]\ntail_lines = 5\n"
            ),
        );
        env
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.work_dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.work_dir.join(relative))
            .unwrap_or_else(|_| panic!("Missing file: {relative}"))
    }

    fn exists(&self, relative: &str) -> bool {
        self.work_dir.join(relative).exists()
    }

    /// Run a br command and capture its output
    fn run(&self, args: &[&str]) -> RunOutput {
        self.run_with_stdin(args, "")
    }

    fn run_with_stdin(&self, args: &[&str], stdin: &str) -> RunOutput {
        let mut child = Command::new(&self.binary_path)
            .args(args)
            .current_dir(&self.work_dir)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to execute br command");

        child
            .stdin
            .take()
            .unwrap()
            .write_all(stdin.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();

        RunOutput {
            code: output.status.code().expect("br was killed by a signal"),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    fn path(&self) -> &Path {
        &self.work_dir
    }
}

#[test]
fn test_init_creates_config() {
    let env = TestEnv::new();

    let output = env.run(&["init"]);
    assert_eq!(output.code, 0);
    assert!(output.stdout.contains("Created config:"));
    assert!(env.exists("batchrun.toml"));

    let output = env.run(&["init"]);
    assert_eq!(output.code, 0);
    assert!(output.stdout.contains("already exists"));
}

#[test]
fn test_run_mixed_batch_exits_with_failure_count() {
    let env = TestEnv::with_config(1);
    env.write("tutorials/basics/a.sh", "echo alpha\nexit 0\n");
    env.write("tutorials/basics/b.sh", "echo bravo-broke >&2\nexit 1\n");
    env.write("tutorials/basics/c.sh", "exec sleep 30\n");

    let output = env.run(&["run", "basics"]);
    assert_eq!(output.code, 2, "stderr: {}", output.stderr);

    assert!(output.stdout.contains("[1/3] pass"));
    assert!(output.stdout.contains("[2/3] fail"));
    assert!(output.stdout.contains("[3/3] timeout"));
    assert!(output.stdout.contains("bravo-broke"));
    assert!(output.stdout.contains("1 of 3 passed (1 timed out)"));

    let record = env.read("batch-logs/summary.csv");
    let lines: Vec<&str> = record.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("tutorials/basics/a.sh,pass,"));
    assert!(lines[1].starts_with("tutorials/basics/b.sh,fail,"));
    assert_eq!(lines[2], "tutorials/basics/c.sh,timeout,1.000");

    assert!(env.read("batch-logs/a.log").contains("alpha"));
    assert!(env.read("batch-logs/b.log").contains("bravo-broke"));
    assert!(env.exists("batch-logs/c.log"));

    let report: Value = serde_json::from_str(&env.read("batch-logs/report.json")).unwrap();
    assert_eq!(report["summary"]["total"], 3);
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["summary"]["failed"], 2);
    assert_eq!(report["group"], "basics");
    assert_eq!(report["mode"], "full_scan");
}

#[test]
fn test_all_passing_exits_zero() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 0\n");
    env.write("tutorials/basics/b.sh", "exit 0\n");

    let output = env.run(&["run", "basics"]);
    assert_eq!(output.code, 0);
    assert!(output.stdout.contains("2 of 2 passed"));
}

#[test]
fn test_empty_group_is_success() {
    let env = TestEnv::with_config(10);
    std::fs::create_dir_all(env.path().join("tutorials/empty")).unwrap();

    let output = env.run(&["run", "empty"]);
    assert_eq!(output.code, 0);
    assert!(output.stdout.contains("0 of 0 passed"));
    assert_eq!(env.read("batch-logs/summary.csv"), "");
}

#[test]
fn test_missing_group_is_hard_error() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 0\n");

    let output = env.run(&["run", "basic"]);
    assert_eq!(output.code, 255);
    assert!(output.stderr.contains("Task group not found: basic"));
    assert!(output.stderr.contains("Did you mean: basics"));
    assert!(!env.exists("batch-logs"));
}

#[test]
fn test_change_list_from_stdin() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 0\n");
    env.write("tutorials/basics/b.sh", "exit 1\n");

    let output = env.run_with_stdin(
        &["run", "basics", "--changed", "-"],
        "README.md\ntutorials/basics/a.sh\n",
    );
    assert_eq!(output.code, 0, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("1 of 1 passed"));
    assert!(!env.exists("batch-logs/b.log"));
}

// Nothing in the change list belongs to the group: deliberate no-op.
#[test]
fn test_change_list_without_matches_is_noop() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 1\n");
    env.write("changed.txt", "src/main.rs\ndocs/guide.md\n");

    let output = env.run(&["run", "basics", "--changed", "changed.txt"]);
    assert_eq!(output.code, 0);
    assert!(output.stdout.contains("0 of 0 passed"));
}

#[test]
fn test_timeout_flag_overrides_config() {
    let env = TestEnv::with_config(600);
    env.write("tutorials/slow/hang.sh", "exec sleep 30\n");

    let output = env.run(&["run", "slow", "--timeout", "1"]);
    assert_eq!(output.code, 1);
    assert_eq!(
        env.read("batch-logs/summary.csv"),
        "tutorials/slow/hang.sh,timeout,1.000\n"
    );
}

#[test]
fn test_json_output_is_the_report() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 0\n");

    let output = env.run(&["run", "basics", "--json", "--log-dir", "out"]);
    assert_eq!(output.code, 0);

    let report: Value = serde_json::from_str(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["summary"]["entries"][0]["outcome"]["kind"], "pass");
    assert!(output.stderr.contains("1 of 1 passed"));
    assert!(env.exists("out/report.json"));
}

#[test]
fn test_patches_and_step_summary() {
    let env = TestEnv::new();
    env.write(
        "batchrun.toml",
        r#"root = "tutorials"
extension = "sh"
interpreter = ["sh"]

[[patch]]
path = "tutorials/basics/train.sh"
find = "exit 1"
replace = "exit 0"
"#,
    );
    env.write("tutorials/basics/train.sh", "exit 1\n");

    let output = env.run(&["run", "basics", "--step-summary", "summary.md"]);
    assert_eq!(output.code, 0, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("Applied 1 of 1 patch(es)"));
    assert_eq!(env.read("tutorials/basics/train.sh"), "exit 0\n");

    let markdown = env.read("summary.md");
    assert!(markdown.contains("### Batch results: basics"));
    assert!(markdown.contains("| `tutorials/basics/train.sh` | pass |"));
}

#[test]
fn test_list_shows_tasks_without_running() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/b.sh", "exit 1\n");
    env.write("tutorials/basics/a.sh", "exit 1\n");
    env.write("tutorials/basics/notes.txt", "");

    let output = env.run(&["list", "basics", "--json"]);
    assert_eq!(output.code, 0);
    let labels: Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(
        labels,
        serde_json::json!(["tutorials/basics/a.sh", "tutorials/basics/b.sh"])
    );
    assert!(!env.exists("batch-logs"));
}

#[test]
fn test_config_is_found_from_subdirectory() {
    let env = TestEnv::with_config(10);
    env.write("tutorials/basics/a.sh", "exit 0\n");
    std::fs::create_dir_all(env.path().join("nested/deeper")).unwrap();

    let output = Command::new(&env.binary_path)
        .args(["list", "basics"])
        .current_dir(env.path().join("nested/deeper"))
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("tutorials/basics/a.sh"));
}
