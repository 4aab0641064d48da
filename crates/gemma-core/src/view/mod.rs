//! Projection of console state onto a display surface
//!
//! Rendering is derived from the filters, the run controller and the archive;
//! the renderer only remembers what it last drew so it can skip redundant work.

mod bindings;
mod event_log;
mod renderer;
mod surface;

pub use bindings::{Action, Binding, BindingTable, UiEvent};
pub use event_log::{EventLog, LogEntry, LogLevel, Toast};
pub use renderer::ViewRenderer;
pub use surface::{NodeKind, NodeTree, ViewNode, ViewSurface, containers};
