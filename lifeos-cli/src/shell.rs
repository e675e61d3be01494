/// Interactive shell
///
/// Reads one command per line from stdin, runs it and prints the result.
/// Errors are printed and the shell keeps going. `quit`, `exit`, end of
/// input or Ctrl-C leave the shell.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::{ShellCommand, ShellLine};
use crate::runner::Runner;

const PROMPT: &str = "lifeos> ";

/// What the shell does after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text and read the next line
    Continue(String),

    /// Leave the shell
    Quit,
}

/// Parses and runs one line
pub async fn handle_line(runner: &mut Runner, line: &str) -> Outcome {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Outcome::Continue(String::new());
    }

    let parsed = match ShellLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        // Also covers `help`, which clap reports as an error
        Err(e) => return Outcome::Continue(e.render().to_string()),
    };

    let result = match parsed.command {
        ShellCommand::Quit => return Outcome::Quit,
        ShellCommand::Login { email, password } => runner.login(&email, &password).await,
        ShellCommand::Logout => runner.logout().await,
        ShellCommand::App(command) => runner.execute(&command).await,
    };

    match result {
        Ok(text) => Outcome::Continue(text),
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            Outcome::Continue(format!("Error: {}", e))
        }
    }
}

/// Runs the shell until the user leaves
pub async fn run(runner: &mut Runner) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let greeting = match runner.app().status().user() {
        Some(user) => format!("Signed in as {}.", user.email),
        None => "Not signed in. Use `login <email> <password>`.".to_string(),
    };
    stdout
        .write_all(format!("LifeOS shell. {} Type `help` for commands.\n", greeting).as_bytes())
        .await?;

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            stdout.write_all(b"\n").await?;
            break;
        };

        match handle_line(runner, &line).await {
            Outcome::Quit => break,
            Outcome::Continue(text) if text.is_empty() => {}
            Outcome::Continue(text) => {
                stdout.write_all(text.trim_end().as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
        }
    }

    tracing::debug!("Shell closed");
    Ok(())
}
