mod dispatcher;
mod event;
mod sink;

pub use dispatcher::HookDispatcher;
pub use event::HookEvent;
pub use sink::{HookSink, HookSinkError, HttpSink, TracingSink};
