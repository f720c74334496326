use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    temp_dir: TempDir,
    home: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let home = temp_dir.path().join("home");
        std::fs::create_dir_all(&home).expect("failed to create HOME");

        Self { temp_dir, home }
    }

    /// A path inside the temp dir that does not exist
    fn missing(&self, name: &str) -> String {
        self.temp_dir.path().join(name).display().to_string()
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str], vars: &[(&str, String)]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("streamvault"));

    let mut command = Command::new(bin_path);
    command
        .args(args)
        .env_clear()
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", env.temp_dir.path().join("xdg-data"));
    for (key, value) in vars {
        command.env(key, value);
    }

    command
        .output()
        .unwrap_or_else(|e| panic!("failed to execute streamvault: {e}"))
}

fn assert_failure(args: &[&str], output: &Output, expected: &str) {
    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        !output.status.success(),
        "streamvault {rendered_args} should have failed\nstdout:\n{stdout}\nstderr:\n{stderr}"
    );
    assert!(
        stderr.contains(expected),
        "expected '{expected}' in stderr of streamvault {rendered_args}\nstdout:\n{stdout}\nstderr:\n{stderr}"
    );
}

fn bad_tls(env: &CliTestEnv, prefix: &str) -> Vec<(String, String)> {
    vec![
        (format!("{prefix}TLS_CA"), env.missing("ca.pem")),
        (format!("{prefix}TLS_CERT"), env.missing("client.pem")),
        (format!("{prefix}TLS_KEY"), env.missing("client.key")),
    ]
}

fn as_vars(vars: &[(String, String)]) -> Vec<(&str, String)> {
    vars.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
}

#[test]
fn version_flag_prints_version() {
    let env = CliTestEnv::new();
    let output = run_bin(&env, &["--version"], &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("streamvault "));
}

#[test]
fn invalid_tls_material_is_fatal() {
    let env = CliTestEnv::new();
    let vars = bad_tls(&env, "");

    let output = run_bin(&env, &[], &as_vars(&vars));
    assert_failure(&[], &output, "failed to load TLS material");
}

#[test]
fn env_prefix_selects_prefixed_variables() {
    let env = CliTestEnv::new();
    let vars = bad_tls(&env, "GTR_");
    let args = ["--env-prefix", "GTR_"];

    let output = run_bin(&env, &args, &as_vars(&vars));
    assert_failure(&args, &output, "failed to load TLS material");
}

#[test]
fn env_prefix_ignores_unprefixed_variables() {
    let env = CliTestEnv::new();
    let mut vars = bad_tls(&env, "");
    vars.push(("GTR_STORAGE_BACKEND".to_string(), "rethinkdb".to_string()));
    let args = ["--env-prefix", "GTR_"];

    let output = run_bin(&env, &args, &as_vars(&vars));
    assert_failure(&args, &output, "failed to load configuration");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown storage backend 'rethinkdb'"));
}

#[test]
fn secrets_are_not_logged() {
    let env = CliTestEnv::new();
    let mut vars = bad_tls(&env, "");
    vars.push(("PASSWORD".to_string(), "hunter2".to_string()));
    vars.push(("ACCESS_TOKEN".to_string(), "token-value".to_string()));
    vars.push(("HOST".to_string(), "db.internal".to_string()));

    let output = run_bin(&env, &[], &as_vars(&vars));
    assert_failure(&[], &output, "failed to load TLS material");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Storage Host: db.internal"), "stdout:\n{stdout}");
    assert!(stdout.contains("Storage Password: <set>"), "stdout:\n{stdout}");
    assert!(stdout.contains("Stream Access Token: <set>"), "stdout:\n{stdout}");
    assert!(!stdout.contains("hunter2"));
    assert!(!stdout.contains("token-value"));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("hunter2"));
}
