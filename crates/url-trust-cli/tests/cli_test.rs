//! Integration tests for the `url-trust` binary.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

const FIXTURE_TS: &str = "1700000000000";

fn url_trust_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_url-trust"));
    cmd.env_remove("URL_TRUST_KEYS_FILE").env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../url-trust/tests/fixtures")
        .join(name)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn sign_fixture(uri: &str) -> String {
    let output = url_trust_cmd()
        .args(["sign", uri, "--ts", FIXTURE_TS, "--key"])
        .arg(fixture("signer_private.pem"))
        .output()
        .expect("failed to run url-trust sign");
    assert!(output.status.success(), "sign should succeed");
    stdout(&output)
}

fn verify(uri: &str, keys: &PathBuf, now: &str) -> Output {
    url_trust_cmd()
        .args(["verify", uri, "--now", now, "--keys"])
        .arg(keys)
        .output()
        .expect("failed to run url-trust verify")
}

#[test]
fn test_keygen_creates_keypair() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path();

    let output = url_trust_cmd()
        .args(["keygen", "--out"])
        .arg(out_dir)
        .output()
        .expect("failed to run url-trust keygen");

    assert!(output.status.success(), "keygen should succeed");
    assert!(out_dir.join("private_key.pem").exists());
    assert!(out_dir.join("public_key.pem").exists());
    assert!(stdout(&output).contains("public_key: MII"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(out_dir.join("private_key.pem")).unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "private key should have mode 0600");
    }
}

#[test]
fn test_keygen_refuses_overwrite_without_force() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path();

    let output = url_trust_cmd()
        .args(["keygen", "--out"])
        .arg(out_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = url_trust_cmd()
        .args(["keygen", "--out"])
        .arg(out_dir)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "should fail without --force");

    let output = url_trust_cmd()
        .args(["keygen", "--force", "--out"])
        .arg(out_dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "should succeed with --force");
}

#[test]
fn test_sign_output_is_deterministic_for_fixed_ts() {
    let first = sign_fixture("ext://acme.tool?foo=bar");
    let second = sign_fixture("ext://acme.tool?foo=bar");

    assert!(first.starts_with("ext://acme.tool?foo=bar&ts=1700000000000&sign="));
    assert_eq!(first, second);
}

#[test]
fn test_sign_refuses_uri_with_timestamp() {
    let output = url_trust_cmd()
        .args(["sign", "ext://acme.tool?ts=1", "--key"])
        .arg(fixture("signer_private.pem"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_sign_verify_roundtrip() {
    let keys = fixture("keys.yaml");
    let signed = sign_fixture("ext://acme.tool/run?foo=bar");

    let output = verify(&signed, &keys, FIXTURE_TS);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "trusted");

    let tampered = signed.replacen("foo=bar", "foo=baz", 1);
    assert_eq!(verify(&tampered, &keys, FIXTURE_TS).status.code(), Some(1));
}

#[test]
fn test_verify_time_window() {
    let keys = fixture("keys.yaml");
    let signed = sign_fixture("ext://acme.tool?foo=bar");

    assert_eq!(verify(&signed, &keys, "1700000600000").status.code(), Some(0));
    assert_eq!(verify(&signed, &keys, "1700000600001").status.code(), Some(1));
    assert_eq!(verify(&signed, &keys, "1699999999999").status.code(), Some(1));
}

#[test]
fn test_verify_openssl_fixture() {
    let uri = std::fs::read_to_string(fixture("openssl_signed_uri.txt")).unwrap();
    let output = verify(uri.trim(), &fixture("keys.yaml"), FIXTURE_TS);

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_verify_quiet_prints_nothing() {
    let output = url_trust_cmd()
        .args(["verify", "ext://acme.tool?foo=bar", "--quiet", "--keys"])
        .arg(fixture("keys.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_verify_without_keys_rejects() {
    let signed = sign_fixture("ext://acme.tool?foo=bar");
    let output = url_trust_cmd()
        .args(["verify", &signed, "--now", FIXTURE_TS])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_verify_missing_keys_file_is_config_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.yaml");
    let signed = sign_fixture("ext://acme.tool?foo=bar");

    assert_eq!(verify(&signed, &missing, FIXTURE_TS).status.code(), Some(2));
}

#[test]
fn test_sign_with_missing_key_is_config_error() {
    let tmp = TempDir::new().unwrap();
    let output = url_trust_cmd()
        .args(["sign", "ext://acme.tool?foo=bar", "--key"])
        .arg(tmp.path().join("missing.pem"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_keygen_sign_verify_with_fresh_key() {
    let tmp = TempDir::new().unwrap();
    let key_dir = tmp.path().join("keys");

    let output = url_trust_cmd()
        .args(["keygen", "--out"])
        .arg(&key_dir)
        .output()
        .unwrap();
    assert!(output.status.success());
    let public_key = stdout(&output)
        .lines()
        .find_map(|line| line.strip_prefix("public_key: "))
        .map(String::from)
        .expect("keygen prints the public key");

    let keys_file = tmp.path().join("trusted.yaml");
    std::fs::write(
        &keys_file,
        format!("trusted_url_public_keys:\n  fresh.tool:\n    - \"{public_key}\"\n"),
    )
    .unwrap();

    let output = url_trust_cmd()
        .args(["sign", "ext://fresh.tool/open?x=1", "--key"])
        .arg(key_dir.join("private_key.pem"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let signed = stdout(&output);

    let output = url_trust_cmd()
        .args(["verify", &signed, "--keys"])
        .arg(&keys_file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
}
