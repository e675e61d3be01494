/// Integration tests for the command-line client
///
/// Runs shell lines against the in-process backend with the demo account
/// seeded, the same way `lifeos` does on startup.
///
/// Run with: cargo test --test shell_tests

use lifeos_cli::backend::Services;
use lifeos_cli::cli::Command;
use lifeos_cli::config::DemoAccount;
use lifeos_cli::runner::Runner;
use lifeos_cli::shell::{handle_line, Outcome};
use lifeos_cli::CliError;
use lifeos_client::app::LifeOs;
use lifeos_client::session::SessionStatus;
use std::sync::Arc;

const SECRET: &str = "shell-test-secret-at-least-32-bytes-long";
const EMAIL: &str = "demo@example.com";
const PASSWORD: &str = "demo-password";

async fn runner() -> Runner {
    let demo = DemoAccount {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
    };
    let services = Services::memory(SECRET, &demo).await.unwrap();
    Runner::new(LifeOs::start(services.auth, services.data))
}

async fn signed_in() -> Runner {
    let mut runner = runner().await;
    runner.login(EMAIL, PASSWORD).await.unwrap();
    runner
}

async fn run(runner: &mut Runner, line: &str) -> String {
    match handle_line(runner, line).await {
        Outcome::Continue(text) => text,
        Outcome::Quit => panic!("unexpected quit on {:?}", line),
    }
}

#[tokio::test]
async fn test_protected_commands_need_sign_in() {
    let mut runner = runner().await;

    let result = runner.execute(&Command::Today).await;
    assert!(matches!(result, Err(CliError::NotSignedIn)));

    let output = run(&mut runner, "inbox").await;
    assert!(output.starts_with("Error: Not signed in"));
}

#[tokio::test]
async fn test_login_and_logout() {
    let mut runner = runner().await;

    let output = run(&mut runner, "login demo@example.com wrong").await;
    assert_eq!(output, "Error: Sign-in failed");

    let output = run(&mut runner, "login demo@example.com demo-password").await;
    assert_eq!(output, "Signed in as demo@example.com");

    let store = runner.app().store().await.unwrap();
    let output = run(&mut runner, "login demo@example.com demo-password").await;
    assert_eq!(output, "Already signed in as demo@example.com, use `logout` first");
    let output = run(&mut runner, "login other@example.com whatever").await;
    assert_eq!(output, "Already signed in as demo@example.com, use `logout` first");
    assert!(Arc::ptr_eq(&store, &runner.app().store().await.unwrap()));
    assert!(run(&mut runner, "capture still works").await.starts_with("Captured"));

    let output = run(&mut runner, "logout").await;
    assert_eq!(output, "Signed out");
    assert_eq!(runner.app().status(), SessionStatus::SignedOut);

    let output = run(&mut runner, "logout").await;
    assert_eq!(output, "Not signed in");
}

#[tokio::test]
async fn test_capture_and_convert_by_position() {
    let mut runner = signed_in().await;

    let output = run(&mut runner, "capture book flights for june").await;
    assert!(output.starts_with("Captured."));
    // Newest first
    assert!(output.contains("  1. book flights for june"));

    let output = run(&mut runner, "convert 1 -p 5 -c finance").await;
    assert!(output.starts_with("Converted to task: ★★★★★ book flights for june [Finance]"));
    assert!(!output.contains("book flights for june  ("));

    let output = run(&mut runner, "board -c finance").await;
    assert!(output.contains("  1. ★★★★★ book flights for june  [Finance]"));
}

#[tokio::test]
async fn test_today_and_done() {
    let mut runner = signed_in().await;

    let output = run(&mut runner, "today").await;
    assert!(output.contains("Next up:"));
    assert!(output.contains("  1. ★★★★★ Finish the quarterly report"));

    let output = run(&mut runner, "done 1").await;
    assert!(output.starts_with("Done: Finish the quarterly report"));
    assert!(output.contains("1 completed today"));

    let output = run(&mut runner, "completed").await;
    assert!(output.contains("Completed (1)"));
    assert!(output.contains("Finish the quarterly report"));

    // Completing it again is a conflict reported by the service
    let output = run(&mut runner, "done 1").await;
    assert!(output.starts_with("Error:"), "{}", output);
}

#[tokio::test]
async fn test_add_and_remove_task() {
    let mut runner = signed_in().await;

    let output = run(&mut runner, "add water the plants -p 1 -c personal").await;
    assert!(output.starts_with("Added: ★☆☆☆☆ water the plants"));

    let board = run(&mut runner, "board").await;
    let position = board
        .lines()
        .find(|l| l.contains("water the plants"))
        .and_then(|l| l.trim().split('.').next())
        .unwrap()
        .to_string();

    let output = run(&mut runner, &format!("rm-task {}", position)).await;
    assert!(output.starts_with("Deleted."));
    assert!(!output.contains("water the plants"));
}

#[tokio::test]
async fn test_bad_input_is_reported() {
    let mut runner = signed_in().await;
    run(&mut runner, "inbox").await;

    let output = run(&mut runner, "rm-inbox zzzz").await;
    assert_eq!(output, "Error: Nothing matches 'zzzz'");

    let output = run(&mut runner, "capture").await;
    assert!(output.contains("required"));

    let output = run(&mut runner, "add x -p 7").await;
    assert!(output.contains("Priority must be between 1 and 5"));

    let output = run(&mut runner, "frobnicate").await;
    assert!(output.contains("unrecognized subcommand"));
}

#[tokio::test]
async fn test_blank_line_and_quit() {
    let mut runner = runner().await;

    assert_eq!(handle_line(&mut runner, "   ").await, Outcome::Continue(String::new()));
    assert_eq!(handle_line(&mut runner, "quit").await, Outcome::Quit);
    assert_eq!(handle_line(&mut runner, "exit").await, Outcome::Quit);
}
