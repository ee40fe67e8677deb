use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

fn skillsync() -> Command {
    let mut cmd = Command::cargo_bin("skillsync").expect("Binary exists");
    cmd.env_remove("SKILLSYNC_CHECKOUT")
        .env_remove("SKILLSYNC_PROJECT");
    cmd
}

fn git_available() -> bool {
    StdCommand::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=skillsync",
            "-c",
            "user.email=skillsync@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .status()
        .expect("git runs");
    assert!(status.success(), "git {args:?} failed");
}

fn write(dir: &Path, path: &str, content: &str) {
    let target = dir.join(path);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, content).unwrap();
}

fn registry_checkout(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    write(dir, "skills/flutter/bloc/SKILL.md", "# Bloc");
    write(dir, "skills/flutter/bloc/references/events.md", "events");
    write(dir, "skills/flutter/riverpod-state-management/SKILL.md", "# Riverpod");
    write(dir, "skills/metadata.json", r#"{"categories":{"flutter":{}}}"#);
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", "registry"]);
}

#[test]
fn sync_without_config_fails_with_init_hint() {
    let project = tempdir().unwrap();
    skillsync()
        .arg("sync")
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("skillsync init"));
}

#[test]
fn sync_with_invalid_config_fails() {
    let project = tempdir().unwrap();
    fs::write(
        project.path().join(".skillsrc"),
        "registry: https://github.com/acme/skills\nskills:\n  flutter:\n    include: [a/b/c]\n",
    )
    .unwrap();
    skillsync()
        .arg("sync")
        .arg("--project")
        .arg(project.path())
        .arg("--checkout")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid .skillsrc format"));
}

#[test]
fn sync_without_checkout_fails() {
    let project = tempdir().unwrap();
    fs::write(
        project.path().join(".skillsrc"),
        "registry: https://github.com/acme/skills\nskills: {}\n",
    )
    .unwrap();
    skillsync()
        .arg("sync")
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--checkout"));
}

#[test]
fn init_writes_a_config_and_refuses_to_overwrite_it() {
    let project = tempdir().unwrap();
    fs::write(
        project.path().join("pubspec.yaml"),
        "name: demo\ndependencies:\n  flutter_bloc: ^8.0.0\n",
    )
    .unwrap();

    skillsync()
        .args(["init", "--agent", "cursor", "--agent", "claude", "--project"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let written = fs::read_to_string(project.path().join(".skillsrc")).unwrap();
    assert!(written.contains("flutter:"));
    assert!(written.contains("ref: main"));
    assert!(written.contains("riverpod-state-management"));
    assert!(!written.contains("bloc-state-management"));

    skillsync()
        .args(["init", "--framework", "golang", "--project"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    skillsync()
        .args(["init", "--framework", "golang", "--force", "--project"])
        .arg(project.path())
        .assert()
        .success();
    let rewritten = fs::read_to_string(project.path().join(".skillsrc")).unwrap();
    assert!(rewritten.contains("golang:"));
}

#[test]
fn init_rejects_unknown_agents() {
    let project = tempdir().unwrap();
    skillsync()
        .args(["init", "--framework", "flutter", "--agent", "vim", "--project"])
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent"));
}

#[test]
fn sync_materializes_from_a_local_registry_checkout() {
    if !git_available() {
        return;
    }
    let registry = tempdir().unwrap();
    registry_checkout(registry.path());
    let project = tempdir().unwrap();
    fs::write(
        project.path().join(".skillsrc"),
        concat!(
            "# project skills\n",
            "registry: https://github.com/acme/skills\n",
            "agents: [cursor]\n",
            "skills:\n  flutter:\n    ref: main\n",
        ),
    )
    .unwrap();
    fs::write(
        project.path().join("pubspec.yaml"),
        "name: demo\ndependencies:\n  flutter_bloc: ^8.0.0\n",
    )
    .unwrap();

    skillsync()
        .arg("sync")
        .arg("--project")
        .arg(project.path())
        .env("SKILLSYNC_CHECKOUT", registry.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("All skills synced"));

    let skills = project.path().join(".cursor/skills/flutter");
    assert_eq!(fs::read_to_string(skills.join("bloc/SKILL.md")).unwrap(), "# Bloc");
    assert!(skills.join("bloc/references/events.md").is_file());
    assert!(!skills.join("riverpod-state-management").exists());

    let config = fs::read_to_string(project.path().join(".skillsrc")).unwrap();
    assert!(config.starts_with("# project skills\n"));
    assert!(config.contains("riverpod-state-management"));
}

#[test]
fn list_shows_detection_status() {
    if !git_available() {
        return;
    }
    let registry = tempdir().unwrap();
    registry_checkout(registry.path());
    let project = tempdir().unwrap();
    fs::write(
        project.path().join("pubspec.yaml"),
        "name: demo\ndependencies:\n  flutter_bloc: ^8.0.0\n",
    )
    .unwrap();

    skillsync()
        .args(["list", "--category", "flutter", "--project"])
        .arg(project.path())
        .arg("--checkout")
        .arg(registry.path())
        .env("SKILLSYNC_PROJECT", "/nonexistent")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("- bloc (no-rule)")
                .and(predicate::str::contains("- riverpod-state-management (not-detected)")),
        );
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_cli_started_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use skillsync::cli::{run, Cli, Commands, Location};

    let project = tempdir().unwrap();
    let cli = Cli {
        command: Commands::Sync {
            location: Location {
                project: project.path().to_path_buf(),
                checkout: None,
            },
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("cli_started")),
        "Expected a 'cli_started' trace event, got: {:?}",
        event_msgs
    );
}
