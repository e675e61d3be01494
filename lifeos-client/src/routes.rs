/// Route table and access guard
///
/// | Path         | Route       | Access                     |
/// |--------------|-------------|----------------------------|
/// | `/`          | `Landing`   | anyone                     |
/// | `/login`     | `Login`     | signed-out users only      |
/// | `/inbox`     | `Inbox`     | signed-in users only       |
/// | `/priority`  | `Priority`  | signed-in users only       |
/// | `/today`     | `Today`     | signed-in users only       |
/// | `/completed` | `Completed` | signed-in users only       |
/// | anything else| `NotFound`  | anyone                     |
///
/// # Example
///
/// ```
/// use lifeos_client::routes::{guard, Guard, Route};
/// use lifeos_client::session::SessionStatus;
///
/// let route = Route::parse("/today");
/// assert_eq!(guard(&SessionStatus::SignedOut, route), Guard::Redirect(Route::Login));
/// ```

use std::fmt;

use crate::session::SessionStatus;

/// Application routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Inbox,
    Priority,
    Today,
    Completed,
    NotFound,
}

impl Route {
    /// Every route with a path
    pub const ALL: [Route; 6] = [
        Route::Landing,
        Route::Login,
        Route::Inbox,
        Route::Priority,
        Route::Today,
        Route::Completed,
    ];

    /// Resolves a path; unknown paths map to `NotFound`
    pub fn parse(path: &str) -> Route {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        Route::ALL
            .into_iter()
            .find(|r| r.path() == Some(path))
            .unwrap_or(Route::NotFound)
    }

    /// Path of the route
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Route::Landing => Some("/"),
            Route::Login => Some("/login"),
            Route::Inbox => Some("/inbox"),
            Route::Priority => Some("/priority"),
            Route::Today => Some("/today"),
            Route::Completed => Some("/completed"),
            Route::NotFound => None,
        }
    }

    /// Requires a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::Inbox | Route::Priority | Route::Today | Route::Completed
        )
    }

    /// Only for signed-out users
    pub fn is_public_only(&self) -> bool {
        matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().unwrap_or("*"))
    }
}

/// Guard decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Session not known yet; render nothing
    Wait,

    /// Go elsewhere instead
    Redirect(Route),

    /// Render the route
    Render(Route),
}

/// Decides what to do with a navigation to `route`
pub fn guard(status: &SessionStatus, route: Route) -> Guard {
    if !route.is_protected() && !route.is_public_only() {
        return Guard::Render(route);
    }

    match status {
        SessionStatus::Pending => Guard::Wait,
        SessionStatus::SignedOut if route.is_protected() => Guard::Redirect(Route::Login),
        SessionStatus::SignedIn(_) if route.is_public_only() => Guard::Redirect(Route::Today),
        _ => Guard::Render(route),
    }
}
