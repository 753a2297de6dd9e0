use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

const LIBRARY_SOURCES: [&str; 4] = [
    "apps/ingress-common/src",
    "libs/core/src",
    "libs/security/src",
    "libs/backpressure/src",
];

#[test]
fn library_crates_avoid_env_var_reads() {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .expect("repo root from manifest dir");

    let mut cmd = Command::new("rg");
    cmd.current_dir(repo_root)
        .arg("-n")
        .arg("--glob")
        .arg("!**/tests/**")
        .arg("--glob")
        .arg("!**/examples/**")
        .arg("env::var|std::env::var")
        .args(LIBRARY_SOURCES);

    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let mut cmd = Command::new("grep");
            cmd.current_dir(repo_root)
                .arg("-R")
                .arg("-n")
                .arg("-E")
                .arg("--exclude-dir=tests")
                .arg("--exclude-dir=examples")
                .arg("env::var|std::env::var")
                .args(LIBRARY_SOURCES);
            cmd.output().expect("run grep fallback")
        }
        Err(err) => panic!("run rg: {err}"),
    };
    match output.status.code() {
        Some(1) => {}
        Some(0) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            panic!("env::var usage detected:\n{stdout}");
        }
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("rg failed: {stderr}");
        }
    }
}
