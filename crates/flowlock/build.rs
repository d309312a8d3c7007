fn main() {
    // Exact tag when built from a release checkout, empty otherwise.
    let describe = std::process::Command::new("git")
        .args(["describe", "--exact-match", "--tags", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .unwrap_or_default();
    println!("cargo:rustc-env=FLOWLOCK_GIT_DESCRIBE={describe}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
