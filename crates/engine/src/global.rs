//! Process-wide default runspace slot.
//!
//! The engine exposes a "default instance" that must track the current
//! frame's handle. The pipeline thread is the single writer; any thread may
//! read a weak reference for diagnostics, but only the pipeline thread may
//! invoke the handle it resolves.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;

use crate::runspace::{Runspace, RunspaceHandle};

static DEFAULT_RUNSPACE: ArcSwapOption<Weak<dyn Runspace>> = ArcSwapOption::const_empty();

/// Installs `runspace` as the process default. Pipeline thread only.
pub fn set_default_runspace(runspace: &RunspaceHandle) {
	DEFAULT_RUNSPACE.store(Some(Arc::new(Arc::downgrade(runspace))));
}

/// Clears the default slot, e.g. when the last frame pops.
pub fn clear_default_runspace() {
	DEFAULT_RUNSPACE.store(None);
}

/// Resolves the default runspace, if one is installed and still alive.
pub fn default_runspace() -> Option<RunspaceHandle> {
	DEFAULT_RUNSPACE.load().as_deref().and_then(Weak::upgrade)
}

/// True when `runspace` is the installed default. The executor checks this
/// before every engine call on the current frame.
pub fn is_default_runspace(runspace: &RunspaceHandle) -> bool {
	default_runspace().is_some_and(|current| Arc::ptr_eq(&current, runspace))
}
