//! Interactive scripting-host execution core.
//!
//! Serializes every engine invocation onto one dedicated pipeline thread
//! while keeping the editor responsive: promise-returning task submission,
//! dual-priority foreground/background deques, preemptive cancellation,
//! reentrant debugger loops, and a console REPL that interleaves with queued
//! work.

pub mod cancel;
pub mod console;
pub mod context;
pub mod deque;
pub mod error;
pub mod executor;
pub mod frame;
pub mod options;
pub mod readline;
mod repl;
pub mod stack;
pub mod task;

pub use cancel::{CancelScope, CancellationContext};
pub use console::{ConsoleHost, NullConsole};
pub use context::{RunspaceContext, SessionEvent};
pub use deque::{PriorityDeque, TakeError};
pub use error::TaskError;
pub use executor::{PipelineExecutor, PipelineExecutorBuilder, RunspaceFactory};
pub use frame::{FrameType, RunspaceFrame};
pub use options::{ExecutionOptions, Priority};
pub use readline::{IdleHandler, NoInput, ReadKeyHandler, ReadLineError, ReadLineProvider};
pub use stack::FrameStack;
pub use task::{ExecutionStatus, ExecutionStatusEvent, TaskHandle};
