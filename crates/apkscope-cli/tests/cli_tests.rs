//! Integration tests for apkscope-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use apkscope_core::manifest::MANIFEST_ENTRY;
use apkscope_core::test_utils::AttrValue;
use apkscope_core::test_utils::AxmlBuilder;
use apkscope_core::test_utils::create_test_dex;
use apkscope_core::test_utils::write_test_zip;
use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

fn apkscope_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("apkscope");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn manifest(package: &str) -> Vec<u8> {
    AxmlBuilder::new()
        .start(
            "manifest",
            &[
                ("package", AttrValue::Str(package)),
                ("versionName", AttrValue::Str("2.4.0")),
                ("versionCode", AttrValue::Int(240)),
            ],
        )
        .leaf("uses-permission", &[("name", AttrValue::Str("android.permission.INTERNET"))])
        .start("application", &[])
        .leaf("activity", &[("name", AttrValue::Str(".MainActivity"))])
        .end()
        .end()
        .build()
}

/// Writes an APK with ARM libraries and a few third-party classes.
fn write_sample_apk(dir: &Path, name: &str, package: &str) -> PathBuf {
    let main_activity = format!("{package}.MainActivity");
    let dex = create_test_dex(&[
        main_activity.as_str(),
        "okhttp3.internal.http.RealCall",
        "okhttp3.internal.http.RetryInterceptor",
        "okhttp3.internal.connection.Exchange",
        "kotlin.Unit",
    ]);
    let path = dir.join(name);
    write_test_zip(
        &path,
        &[
            (MANIFEST_ENTRY, &manifest(package)),
            ("classes.dex", &dex),
            ("lib/arm64-v8a/libnative.so", b"\x7fELF64"),
            ("lib/armeabi-v7a/libnative.so", b"\x7fELF32"),
        ],
    );
    path
}

/// Lays out `<root>/<package>-1/base.apk` for each package.
fn write_app_root(packages: &[&str]) -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");
    for package in packages {
        let dir = temp.path().join(format!("{package}-1"));
        fs::create_dir_all(&dir).unwrap();
        write_sample_apk(&dir, "base.apk", package);
    }
    temp
}

#[test]
fn test_version_flag() {
    apkscope_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("apkscope"));
}

#[test]
fn test_help_flag() {
    apkscope_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("has-class"));
}

#[test]
fn test_abi_prefers_arm64() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    apkscope_cmd()
        .arg("abi")
        .arg(&apk)
        .args(["--device-abi", "arm64-v8a", "--device-abi", "armeabi-v7a"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("arm64-v8a"));
}

#[test]
fn test_abi_on_32bit_device() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    apkscope_cmd()
        .arg("abi")
        .arg(&apk)
        .args(["--device-abi", "armeabi-v7a"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("armeabi-v7a"));
}

#[test]
fn test_abi_json() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    let output = apkscope_cmd()
        .args(["--json", "abi"])
        .arg(&apk)
        .args(["--device-abi", "arm64-v8a", "--all-abis"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "abi");
    assert_eq!(json["data"]["abi"]["abi"], "armv8");
    assert_eq!(json["data"]["abi_set"], serde_json::json!(["armv8", "armv7"]));
}

#[test]
fn test_classes_folds_and_skips_own_package() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    apkscope_cmd()
        .arg("classes")
        .arg(&apk)
        .assert()
        .success()
        .stdout(predicate::str::contains("okhttp3.internal.http"))
        .stdout(predicate::str::contains("okhttp3.internal.connection.Exchange"))
        .stdout(predicate::str::contains("com.example.app").not())
        .stdout(predicate::str::contains("kotlin").not());
}

#[test]
fn test_has_class_hit_and_miss() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    apkscope_cmd()
        .arg("has-class")
        .arg(&apk)
        .arg("okhttp3.internal.*")
        .assert()
        .success()
        .stdout(predicate::str::contains("found"));

    apkscope_cmd()
        .arg("has-class")
        .arg(&apk)
        .arg("retrofit2.Retrofit")
        .assert()
        .failure()
        .stderr(predicate::str::contains("class not found: retrofit2.Retrofit"));
}

#[test]
fn test_inspect_archive() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    apkscope_cmd()
        .arg("inspect")
        .arg(&apk)
        .args(["--device-abi", "arm64-v8a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.app"))
        .stdout(predicate::str::contains("2.4.0 (240)"))
        .stdout(predicate::str::contains("arm64-v8a"))
        .stdout(predicate::str::is_match(r"Kotlin:\s+yes").unwrap());
}

#[test]
fn test_inspect_with_abi_override() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");

    let output = apkscope_cmd()
        .args(["--json", "inspect"])
        .arg(&apk)
        .args(["--device-abi", "arm64-v8a", "--abi", "x86"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let data = &json["data"];
    assert_eq!(data["abi"]["abi"], "x86");
    assert_eq!(data["standalone"], true);
    assert_eq!(data["permissions"][0]["name"], "android.permission.INTERNET");
    assert_eq!(data["components"][0]["name"], "com.example.app.MainActivity");
}

#[test]
fn test_inspect_installed_package() {
    let root = write_app_root(&["com.example.app", "org.sample.notes"]);

    apkscope_cmd()
        .arg("inspect")
        .arg("org.sample.notes")
        .arg("--root")
        .arg(root.path())
        .args(["--device-abi", "armeabi-v7a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("org.sample.notes"))
        .stdout(predicate::str::contains("armeabi-v7a"));
}

#[test]
fn test_inspect_unknown_package_hints() {
    let root = write_app_root(&["com.example.app"]);

    apkscope_cmd()
        .arg("inspect")
        .arg("com.missing")
        .arg("--root")
        .arg(root.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package not found: com.missing"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_inspect_rejects_non_zip() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("notes.txt");
    fs::write(&bogus, "plain text").unwrap();

    apkscope_cmd()
        .arg("inspect")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid archive"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_list_packages() {
    let root = write_app_root(&["com.example.app", "org.sample.notes"]);

    apkscope_cmd()
        .arg("list")
        .arg("--root")
        .arg(root.path())
        .args(["--device-abi", "arm64-v8a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.app"))
        .stdout(predicate::str::contains("org.sample.notes"))
        .stdout(predicate::str::contains("Total: 2 packages"));
}

#[test]
fn test_list_json() {
    let root = write_app_root(&["com.example.app"]);

    let output = apkscope_cmd()
        .args(["--json", "list", "--root"])
        .arg(root.path())
        .args(["--device-abi", "armeabi-v7a"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["data"][0]["id"], "com.example.app");
    assert_eq!(json["data"][0]["frozen"], true);
    assert_eq!(json["data"][0]["abi"]["abi"], "armv7");
}

#[test]
fn test_list_missing_root() {
    apkscope_cmd()
        .args(["list", "--root", "/nonexistent/apkscope/root"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_config_file_is_applied() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");
    let config = temp.path().join("apkscope.toml");
    fs::write(&config, "deep_hierarchy_exceptions = [\"okhttp3.internal.http\"]\n").unwrap();

    apkscope_cmd()
        .arg("classes")
        .arg(&apk)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("okhttp3.internal.http.RealCall"));
}

#[test]
fn test_invalid_config_hints() {
    let temp = TempDir::new().unwrap();
    let apk = write_sample_apk(temp.path(), "app.apk", "com.example.app");
    let config = temp.path().join("apkscope.toml");
    fs::write(&config, "max_dex_containers = \"five\"\n").unwrap();

    apkscope_cmd()
        .arg("classes")
        .arg(&apk)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_completion_bash() {
    apkscope_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("apkscope"));
}
