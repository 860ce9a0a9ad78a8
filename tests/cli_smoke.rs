use std::process::Command;

#[test]
fn help_lists_the_login_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_relay"))
        .arg("--help")
        .output()
        .expect("failed to execute relay binary");

    assert!(
        output.status.success(),
        "relay --help failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--phone"));
    assert!(stdout.contains("--verbose"));
}
