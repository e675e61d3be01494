/// View-models
///
/// Read-only derivations of a [`Snapshot`](crate::store::Snapshot), one per
/// screen. They hold no state of their own apart from
/// [`ConversionForm`], which is UI state for the inbox screen.
///
/// # Views
///
/// - [`InboxView`] / [`ConversionForm`]: capture inbox
/// - [`PriorityBoard`]: pending tasks by priority, filterable by category
/// - [`TodayFocus`]: next task, up next and today's counters
/// - [`CompletedView`]: completed tasks, most recent first

pub mod completed;
pub mod inbox;
pub mod priority;
pub mod today;

pub use completed::CompletedView;
pub use inbox::{ConversionForm, InboxView};
pub use priority::{CategoryFilter, PriorityBoard};
pub use today::TodayFocus;
