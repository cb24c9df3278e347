//! solver warning channel
//!
//! solvers report benign trouble (hit max_iter, line search stalled) through
//! [`warn`]. by default that ends up in `log::warn!`; inside a [`QuietGuard`]
//! scope the message is counted and dropped instead. scopes are per thread
//! and nest - the previous state comes back when the guard drops, whichever
//! way the scope is left.

use std::cell::Cell;

thread_local! {
    static QUIET_DEPTH: Cell<usize> = const { Cell::new(0) };
    static SUPPRESSED: Cell<usize> = const { Cell::new(0) };
}

/// emit a solver warning unless a quiet scope is active on this thread
pub fn warn(message: impl AsRef<str>) {
    if is_quiet() {
        SUPPRESSED.with(|n| n.set(n.get() + 1));
    } else {
        log::warn!("{}", message.as_ref());
    }
}

/// is any quiet scope active on this thread?
pub fn is_quiet() -> bool {
    QUIET_DEPTH.with(|d| d.get() > 0)
}

/// warnings swallowed on this thread so far
pub fn suppressed_count() -> usize {
    SUPPRESSED.with(|n| n.get())
}

/// silences [`warn`] on the current thread until dropped
#[derive(Debug)]
pub struct QuietGuard {
    // !Send - the guard has to drop on the thread it silenced
    _not_send: std::marker::PhantomData<*const ()>,
}

impl QuietGuard {
    pub fn new() -> Self {
        QUIET_DEPTH.with(|d| d.set(d.get() + 1));
        Self { _not_send: std::marker::PhantomData }
    }
}

impl Default for QuietGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        QUIET_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// run `f` with solver warnings silenced
pub fn suppressed<T>(f: impl FnOnce() -> T) -> T {
    let _guard = QuietGuard::new();
    f()
}
