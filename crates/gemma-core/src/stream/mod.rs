//! Streaming analysis runs
//!
//! A run opens one server-push channel, turns its frames into typed
//! [`StreamEvent`]s and feeds them to a [`RunController`] state machine:
//!
//! ```text
//! Idle -> Connecting -> Running -> Completed | Errored | Cancelled -> Idle
//! ```

mod controller;
mod driver;
mod events;
mod request;
mod source;

pub use controller::{
    RunController, RunOutcome, RunState, RunUpdate, StopHandle, StreamedResult, SummarySource,
    synthesize_summary,
};
pub use driver::drive_run;
pub use events::{DoneEvent, MetaEvent, ResultEvent, StepEvent, StreamEvent};
pub use request::{MAX_STATEMENTS, RunRequest};
pub use source::{EventSource, EventStream, decode_event_stream};
