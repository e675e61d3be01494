/// Command runner
///
/// Executes [`Command`]s against a [`LifeOs`] context. Each command belongs to
/// a screen; the route guard decides whether the screen may be shown before
/// anything is fetched or changed. Mutations print a confirmation followed by
/// the screen they affect.

use lifeos_client::app::LifeOs;
use lifeos_client::routes::{guard, Guard, Route};
use lifeos_client::session::SessionStatus;
use lifeos_client::store::{Snapshot, TaskStore};
use lifeos_client::views::{
    CategoryFilter, CompletedView, ConversionForm, InboxView, PriorityBoard, TodayFocus,
};
use std::sync::Arc;

use crate::cli::Command;
use crate::error::{CliError, CliResult};
use crate::refs::{self, Listings};
use crate::render::{self, Screen};

/// Screen a command runs on
fn route_for(command: &Command) -> Route {
    match command {
        Command::Inbox
        | Command::Capture { .. }
        | Command::Convert { .. }
        | Command::RmInbox { .. } => Route::Inbox,
        Command::Board { .. } | Command::Add { .. } | Command::RmTask { .. } => Route::Priority,
        Command::Completed => Route::Completed,
        Command::Today | Command::Done { .. } | Command::Refresh | Command::Shell => Route::Today,
    }
}

/// Executes commands and remembers the last listings for `<ref>` lookups
pub struct Runner {
    app: LifeOs,
    listings: Listings,
}

impl Runner {
    /// Creates a runner over an application context
    pub fn new(app: LifeOs) -> Self {
        Runner {
            app,
            listings: Listings::default(),
        }
    }

    /// Application context
    pub fn app(&self) -> &LifeOs {
        &self.app
    }

    /// Signs in and waits for the user's data to load
    ///
    /// The login screen is not reachable while signed in, so this reports the
    /// current user instead of starting a second session.
    pub async fn login(&mut self, email: &str, password: &str) -> CliResult<String> {
        let status = self.settled().await;
        if let Guard::Redirect(_) = guard(&status, Route::Login) {
            let current = status.user().map(|u| u.email.as_str()).unwrap_or_default();
            return Ok(format!("Already signed in as {}, use `logout` first", current));
        }

        let user = self.app.sign_in(email, password).await?;
        self.app.ready().await?;
        self.listings = Listings::default();

        tracing::info!(user_id = %user.user_id, "Signed in from the command line");
        Ok(format!("Signed in as {}", user.email))
    }

    /// Signs out
    pub async fn logout(&mut self) -> CliResult<String> {
        if self.settled().await.user().is_none() {
            return Ok("Not signed in".to_string());
        }

        self.app.sign_out().await?;
        self.listings = Listings::default();
        Ok("Signed out".to_string())
    }

    /// Session status once the initial lookup has finished
    async fn settled(&self) -> SessionStatus {
        let mut status = self.app.session().subscribe();
        let settled = match status.wait_for(|s| !s.is_pending()).await {
            Ok(settled) => settled.clone(),
            Err(_) => SessionStatus::SignedOut,
        };
        settled
    }

    /// Applies the route guard and returns the loaded store
    async fn open(&self, route: Route) -> CliResult<Arc<TaskStore>> {
        let status = self.settled().await;

        match guard(&status, route) {
            Guard::Render(_) => Ok(self.app.ready().await?),
            Guard::Redirect(Route::Login) => Err(CliError::NotSignedIn),
            Guard::Redirect(_) | Guard::Wait => {
                tracing::debug!(route = %route, "Route not available");
                Err(CliError::NotSignedIn)
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.app.snapshot()
    }

    fn show_inbox(&mut self) -> String {
        let screen = render::inbox(&InboxView::from_snapshot(&self.snapshot()));
        self.remember_inbox(screen)
    }

    fn show_board(&mut self, filter: CategoryFilter) -> String {
        let screen = render::board(&PriorityBoard::from_snapshot(&self.snapshot(), filter));
        self.remember_tasks(screen)
    }

    fn show_today(&mut self) -> String {
        let screen = render::today(&TodayFocus::from_snapshot(&self.snapshot()));
        self.remember_tasks(screen)
    }

    fn show_completed(&mut self) -> String {
        let screen = render::completed(&CompletedView::from_snapshot(&self.snapshot()));
        self.remember_tasks(screen)
    }

    fn remember_inbox(&mut self, screen: Screen) -> String {
        self.listings.inbox = screen.ids;
        screen.text
    }

    fn remember_tasks(&mut self, screen: Screen) -> String {
        self.listings.tasks = screen.ids;
        screen.text
    }

    fn inbox_ref(&self, reference: &str) -> CliResult<uuid::Uuid> {
        let snapshot = self.snapshot();
        refs::resolve(
            reference,
            &self.listings.inbox,
            snapshot.inbox.items.iter().map(|i| &i.id),
        )
    }

    fn task_ref(&self, reference: &str) -> CliResult<uuid::Uuid> {
        let snapshot = self.snapshot();
        refs::resolve(
            reference,
            &self.listings.tasks,
            snapshot.tasks.items.iter().map(|t| &t.id),
        )
    }

    /// Executes one command and returns what to print
    ///
    /// # Errors
    ///
    /// - `NotSignedIn` if the command's screen requires a session
    /// - `Reference` if a `<ref>` does not name exactly one record
    /// - `Store` for anything the task store rejects
    pub async fn execute(&mut self, command: &Command) -> CliResult<String> {
        if let Command::Shell = command {
            return Ok("Already in the shell".to_string());
        }

        let store = self.open(route_for(command)).await?;

        let output = match command {
            Command::Inbox => self.show_inbox(),

            Command::Capture { text } => {
                store.add_inbox_item(&text.join(" ")).await?;
                format!("Captured.\n\n{}", self.show_inbox())
            }

            Command::Convert {
                reference,
                priority,
                category,
            } => {
                let id = self.inbox_ref(reference)?;
                let mut form = ConversionForm::new();
                form.toggle(id);
                form.priority = *priority;
                form.category = *category;

                let task = form.submit(&store).await?;
                format!(
                    "Converted to task: {} {} [{}]\n\n{}",
                    task.priority.stars(),
                    task.title,
                    task.category,
                    self.show_inbox()
                )
            }

            Command::RmInbox { reference } => {
                let id = self.inbox_ref(reference)?;
                store.remove_inbox_item(id).await?;
                format!("Removed.\n\n{}", self.show_inbox())
            }

            Command::Board { category } => self.show_board(*category),

            Command::Add {
                title,
                priority,
                category,
            } => {
                let task = store.add_task(&title.join(" "), *priority, *category).await?;
                format!(
                    "Added: {} {}\n\n{}",
                    task.priority.stars(),
                    task.title,
                    self.show_board(CategoryFilter::All)
                )
            }

            Command::RmTask { reference } => {
                let id = self.task_ref(reference)?;
                store.delete_task(id).await?;
                format!("Deleted.\n\n{}", self.show_board(CategoryFilter::All))
            }

            Command::Done { reference } => {
                let id = self.task_ref(reference)?;
                let task = store.complete_task(id).await?;
                format!("Done: {}\n\n{}", task.title, self.show_today())
            }

            Command::Today => self.show_today(),

            Command::Completed => self.show_completed(),

            Command::Refresh => {
                store.refresh().await?;
                format!("Refreshed.\n\n{}", self.show_today())
            }

            Command::Shell => String::new(),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeos_shared::models::{Category, Priority};

    #[test]
    fn test_every_command_is_on_a_protected_route() {
        let commands = [
            Command::Inbox,
            Command::Capture { text: vec!["x".into()] },
            Command::Convert {
                reference: "1".into(),
                priority: Priority::default(),
                category: Category::default(),
            },
            Command::Board { category: CategoryFilter::All },
            Command::Done { reference: "1".into() },
            Command::Today,
            Command::Completed,
            Command::Refresh,
        ];

        for command in &commands {
            assert!(route_for(command).is_protected(), "{:?}", command);
        }
    }
}
