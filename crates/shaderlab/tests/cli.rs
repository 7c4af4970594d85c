use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn shaderlab(config_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shaderlab"));
    command
        .env("SHADERLAB_CONFIG_DIR", config_dir)
        .env_remove("SHADERLAB_ROOT")
        .env_remove("SHADERLAB_SHADERS_DIR")
        .env_remove("SHADERLAB_STATIC_DIR")
        .env_remove("SHADERLAB_CONFIG")
        .env_remove("SHADERLAB_CACHE_TTL");
    command
}

#[test]
fn list_prints_structure_as_json() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let project = root.path().join("project");
    let exercise = project.join("src/shaders/chapter01/exercise01");
    fs::create_dir_all(&exercise).unwrap();
    fs::write(exercise.join("fragment.glsl"), "void main() {}").unwrap();

    let output = shaderlab(&config_dir)
        .args(["list", "--root"])
        .arg(&project)
        .output()
        .expect("failed to run shaderlab list");

    assert!(output.status.success());
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["chapter01"]["name"], "chapter01");
    assert_eq!(
        listing["chapter01"]["exercises"]["exercise01"]["name"],
        "exercise01"
    );
}

#[test]
fn list_honours_config_file_in_config_dir() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let project = root.path().join("project");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("shaderlab.toml"),
        format!(
            "[storage]\nroot = \"{}\"\nshaders_dir = \"glsl\"\n",
            project.display()
        ),
    )
    .unwrap();
    let exercise = project.join("glsl/basics/gradient");
    fs::create_dir_all(&exercise).unwrap();
    fs::write(exercise.join("fragment.glsl"), "void main() {}").unwrap();

    let output = shaderlab(&config_dir)
        .arg("list")
        .output()
        .expect("failed to run shaderlab list");

    assert!(output.status.success());
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(listing["basics"]["exercises"]["gradient"].is_object());
}

#[test]
fn invalid_config_file_fails_cleanly() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("shaderlab.toml"), "version = 7\n").unwrap();

    let output = shaderlab(&config_dir)
        .arg("paths")
        .output()
        .expect("failed to run shaderlab paths");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported config version"));
}

#[test]
fn paths_reports_resolved_directories() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    let project = root.path().join("project");

    let output = shaderlab(&config_dir)
        .args(["paths", "--root"])
        .arg(&project)
        .output()
        .expect("failed to run shaderlab paths");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(none, using defaults)"));
    assert!(stdout.contains(&project.join("src/shaders").display().to_string()));
    assert!(stdout.contains("5m"));
}
