//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use lifeos_client::views::CategoryFilter;
use lifeos_shared::models::{Category, Priority};

use crate::config::Backend;

#[derive(Debug, Parser)]
#[command(
    name = "lifeos",
    about = "Capture thoughts, prioritize them, do the next thing",
    version
)]
pub struct Cli {
    /// Email to sign in with (overrides LIFEOS_EMAIL)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Password to sign in with (overrides LIFEOS_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Backend to use (overrides LIFEOS_BACKEND)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Commands shared by the command line and the interactive shell.
///
/// `<ref>` is a 1-based position in the most recently shown list, or a
/// prefix of the record id.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the capture inbox
    Inbox,

    /// Capture a note into the inbox
    Capture {
        /// Note text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Turn an inbox item into a task
    Convert {
        /// Inbox item reference
        reference: String,

        /// Priority, 1-5
        #[arg(short, long, default_value = "3")]
        priority: Priority,

        /// Category
        #[arg(short, long, default_value = "Personal")]
        category: Category,
    },

    /// Show pending tasks by priority
    Board {
        /// Category to show, or "all"
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
    },

    /// Add a task directly
    Add {
        /// Task title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Priority, 1-5
        #[arg(short, long, default_value = "3")]
        priority: Priority,

        /// Category
        #[arg(short, long, default_value = "Personal")]
        category: Category,
    },

    /// Mark a task done
    Done {
        /// Task reference
        reference: String,
    },

    /// Delete a task
    RmTask {
        /// Task reference
        reference: String,
    },

    /// Delete an inbox item
    RmInbox {
        /// Inbox item reference
        reference: String,
    },

    /// Show the next best action
    Today,

    /// Show completed tasks
    Completed,

    /// Refetch everything from the service
    Refresh,

    /// Start an interactive shell (default)
    Shell,
}

/// One line typed into the shell.
#[derive(Debug, Parser)]
#[command(name = "lifeos", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    App(Command),

    /// Sign in
    Login {
        email: String,
        password: String,
    },

    /// Sign out
    Logout,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["lifeos"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.backend, None);
    }

    #[test]
    fn test_capture_joins_words() {
        let cli = Cli::parse_from(["lifeos", "capture", "buy", "oat", "milk"]);
        assert_eq!(
            cli.command,
            Some(Command::Capture {
                text: vec!["buy".into(), "oat".into(), "milk".into()]
            })
        );
    }

    #[test]
    fn test_convert_flags() {
        let cli = Cli::parse_from(["lifeos", "--backend", "memory", "convert", "2", "-p", "5", "-c", "work"]);
        assert_eq!(cli.backend, Some(Backend::Memory));
        assert_eq!(
            cli.command,
            Some(Command::Convert {
                reference: "2".into(),
                priority: Priority::new(5).unwrap(),
                category: Category::Work,
            })
        );
    }

    #[test]
    fn test_add_with_flags_after_title() {
        let cli = Cli::parse_from(["lifeos", "add", "Pay", "rent", "-p", "4", "-c", "Finance"]);
        match cli.command {
            Some(Command::Add { title, priority, category }) => {
                assert_eq!(title.join(" "), "Pay rent");
                assert_eq!(priority.get(), 4);
                assert_eq!(category, Category::Finance);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_priority_rejected() {
        assert!(Cli::try_parse_from(["lifeos", "add", "x", "-p", "9"]).is_err());
        assert!(Cli::try_parse_from(["lifeos", "board", "-c", "chores"]).is_err());
    }

    #[test]
    fn test_shell_line() {
        let line = ShellLine::try_parse_from(["rm-task", "abc123"]).unwrap();
        assert_eq!(
            line.command,
            ShellCommand::App(Command::RmTask { reference: "abc123".into() })
        );

        let line = ShellLine::try_parse_from(["exit"]).unwrap();
        assert_eq!(line.command, ShellCommand::Quit);
    }
}
