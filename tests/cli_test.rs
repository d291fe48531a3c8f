// Command-line contract: flags, exit status and single-line error message
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use image::{ImageBuffer, ImageFormat, Rgba};

fn unique_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "simple_image_sr_cli_{label}_{}_{}",
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_png(path: &PathBuf) {
    ImageBuffer::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 0, 255]))
        .save_with_format(path, ImageFormat::Png)
        .expect("write test png");
}

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_simple-image-sr"))
}

#[test]
fn help_lists_all_flags() {
    let output = cli().arg("--help").output().expect("run --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--input",
        "--output",
        "--model",
        "--layout",
        "--input-key",
        "--output-key",
        "--hist-dir",
        "--max-pixels",
        "--max-file-size",
        "--verbose",
    ] {
        assert!(stdout.contains(flag), "help should mention {flag}:\n{stdout}");
    }
}

#[test]
fn missing_required_flags_is_usage_error() {
    let output = cli().output().expect("run without args");

    assert!(!output.status.success());
}

#[test]
fn missing_model_fails_with_path_and_no_output() {
    let dir = unique_temp_dir("model");
    let input = dir.join("in.png");
    let output_path = dir.join("out.png");
    let model = dir.join("absent.onnx");
    write_png(&input);

    let output = cli()
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output_path)
        .arg("--model")
        .arg(&model)
        .output()
        .expect("run cli");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("错误：[model]"), "stderr: {stderr}");
    assert!(stderr.contains(&model.display().to_string()), "stderr: {stderr}");
    assert!(!output_path.exists());
}

#[test]
fn default_model_is_looked_up_next_to_executable() {
    let dir = unique_temp_dir("default_model");
    let input = dir.join("in.png");
    write_png(&input);

    let output = cli()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(dir.join("out.png"))
        .output()
        .expect("run cli");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("RealESRGAN_x4plus.onnx"), "stderr: {stderr}");
}

#[test]
fn unknown_layout_is_rejected_by_parser() {
    let output = cli()
        .args(["-i", "in.png", "-o", "out.png", "--layout", "rgb565"])
        .output()
        .expect("run cli");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("rgb565"));
}
