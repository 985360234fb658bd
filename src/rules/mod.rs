//! Channel rule evaluation: a pure function of an event, the routing settings
//! of its type, and the service-wide policy.

mod evaluator;

pub use evaluator::{evaluate, in_quiet_hours, ChannelDecision, DecisionReason, RulePolicy};
