//! Notification events, dispatching, and delivery reports.
//!
//! An event flows through [`NotificationDispatcher::dispatch`]: the routing
//! settings of its type are evaluated per channel, every qualifying channel
//! gets its template rendered and sent concurrently, and each attempt that
//! produced a message is written to the notification feed.

mod dispatcher;
mod report;
mod types;

pub use dispatcher::{
    DispatchError, DispatchOptions, DispatcherStats, DispatcherStatsSnapshot,
    NotificationDispatcher,
};
pub use report::{AttemptOutcome, ChannelAttempt, DeliveryReport, FailureReason};
pub use types::{
    event_category, Channel, EventEnvelope, EventMetadata, InvalidEvent, NotificationBuilder,
    NotificationEvent, ParseChannelError, ParsePriorityError, Priority,
};
