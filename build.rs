use std::process::Command;

fn main() {
    // Version info shown by `ovoz version`.
    println!(
        "cargo:rustc-env=OVOZBOT_GIT_HASH={}",
        command_stdout("git", &["rev-parse", "--short", "HEAD"])
    );
    println!(
        "cargo:rustc-env=OVOZBOT_BUILD_DATE={}",
        command_stdout("date", &["+%Y-%m-%d"])
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Trimmed stdout of a command, or "unknown" when it is unavailable.
fn command_stdout(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
