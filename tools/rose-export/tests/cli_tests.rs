//! Integration tests for the rose-export binary
//!
//! Writes fixture files with the crate's encoders, runs the CLI against
//! them and checks the printed or written JSON.

use glam::{Quat, Vec3};
use rose_formats::skeleton::SkeletonVersion;
use rose_formats::{
    AnimationDocument, BinaryEncode, Channel, ChannelKind, ChannelValues, HeightmapDocument,
    SkeletonDocument, SkeletonNode,
};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn rose_export(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rose-export"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to run rose-export")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "rose-export failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn write_fixture<T: BinaryEncode>(dir: &Path, name: &str, doc: &T) {
    std::fs::write(dir.join(name), doc.to_bytes().unwrap()).unwrap();
}

fn skeleton() -> SkeletonDocument {
    let node = |name: &str, parent: u32, position: Vec3| SkeletonNode {
        name: name.into(),
        parent,
        position,
        rotation: Quat::IDENTITY,
    };
    SkeletonDocument {
        version: SkeletonVersion::V3,
        bones: vec![
            node("root", 0, Vec3::ZERO),
            node("spine", 0, Vec3::new(0.0, 0.0, 100.0)),
        ],
        dummies: Vec::new(),
    }
}

#[test]
fn test_inspect_heightmap() {
    let dir = tempdir().expect("Failed to create temp dir");
    let map = HeightmapDocument::new(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    write_fixture(dir.path(), "map.him", &map);

    let output = rose_export(dir.path(), &["inspect", "map.him"]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("size: 2x2"), "{text}");
    assert!(text.contains("height range: 0 .. 3"), "{text}");
}

#[test]
fn test_dump_writes_tagged_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_fixture(dir.path(), "body.zmd", &skeleton());

    let output = rose_export(dir.path(), &["dump", "body.zmd", "-o", "body.json"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("body.json")).unwrap())
            .unwrap();
    assert_eq!(json["format"], "skeleton");
    assert_eq!(json["document"]["bones"][1]["name"], "spine");
}

#[test]
fn test_bind_pose_uses_config_convention() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_fixture(dir.path(), "body.zmd", &skeleton());
    std::fs::write(
        dir.path().join("rose-export.toml"),
        "[convention]\npreset = \"y-up-meters\"\n",
    )
    .unwrap();

    let json = stdout_json(&rose_export(dir.path(), &["bind-pose", "body.zmd"]));
    let spine = &json["joints"][1];
    assert_eq!(spine["parent"], 0);
    // 100 units up Z becomes 1 meter up Y
    let y = spine["position"][1].as_f64().unwrap();
    assert!((y - 1.0).abs() < 1e-5, "{spine}");
    assert!(json["joints"][0]["parent"].is_null());
}

#[test]
fn test_sample_at_time() {
    let dir = tempdir().expect("Failed to create temp dir");
    let animation = AnimationDocument {
        fps: 30,
        frame_count: 2,
        channels: vec![Channel {
            kind: ChannelKind::Position,
            bone: 0,
            values: ChannelValues::Vec3(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]),
        }],
        footer: None,
    };
    write_fixture(dir.path(), "walk.zmo", &animation);

    let json = stdout_json(&rose_export(
        dir.path(),
        &["sample", "walk.zmo", "--time", "0.05"],
    ));
    assert_eq!(json["cursor"]["frame"], 1);
    assert_eq!(json["cursor"]["next_frame"], 0);
    let x = json["channels"][0]["value"][0].as_f64().unwrap();
    assert!((x - 5.0).abs() < 1e-3, "{json}");
}

#[test]
fn test_height_with_explicit_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let map = HeightmapDocument::new(2, 2, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
    write_fixture(dir.path(), "map.him", &map);
    std::fs::write(dir.path().join("custom.toml"), "[output]\npretty = false\n").unwrap();

    let output = rose_export(
        dir.path(),
        &["--config", "custom.toml", "height", "map.him", "0.5", "0.5"],
    );
    let json = stdout_json(&output);
    assert_eq!(json["height"], 15.0);
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 1);
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let map = HeightmapDocument::new(1, 1, vec![0.0]).unwrap();
    write_fixture(dir.path(), "map.him", &map);

    let output = rose_export(
        dir.path(),
        &["--config", "nope.toml", "height", "map.him", "0", "0"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_unknown_extension_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    let output = rose_export(dir.path(), &["inspect", "notes.txt"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unrecognized asset extension"), "{stderr}");
}

#[test]
fn test_truncated_file_reports_parse_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("broken.zmd"), b"ZMD0003\x01\x00").unwrap();

    let output = rose_export(dir.path(), &["inspect", "broken.zmd"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse"), "{stderr}");
}
