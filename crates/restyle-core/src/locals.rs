//! # Runtime locals
//!
//! Components usually don't hold a [`StyleRuntime`] themselves. The host
//! provides one for a subtree of calls and components read it back:
//!
//! ```rust
//! use restyle_core::*;
//!
//! let rt = StyleRuntime::new();
//! with_runtime(&rt, || {
//!     let (style, _sub) = use_sync("group", &ComponentState::new(), |_| {});
//!     assert_eq!(style.key, "group");
//! });
//! ```
//!
//! Frames nest; the innermost runtime wins.

use std::cell::RefCell;

use crate::conditions::ComponentState;
use crate::effects::Subscription;
use crate::runtime::{StyleRuntime, SyncStyle};
use crate::value::StyleList;

thread_local! {
    static RUNTIME_STACK: RefCell<Vec<StyleRuntime>> = const { RefCell::new(Vec::new()) };
}

pub fn with_runtime<R>(rt: &StyleRuntime, f: impl FnOnce() -> R) -> R {
    // Pops the frame even if `f` unwinds.
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            RUNTIME_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    RUNTIME_STACK.with(|st| st.borrow_mut().push(rt.clone()));
    let _guard = Guard;
    f()
}

pub fn current_runtime() -> Option<StyleRuntime> {
    RUNTIME_STACK.with(|st| st.borrow().last().cloned())
}

/// [`StyleRuntime::use_sync`] against the current runtime. Outside of any
/// [`with_runtime`] frame this resolves to nothing.
pub fn use_sync(
    class_name: &str,
    state: &ComponentState,
    on_change: impl Fn(StyleList) + 'static,
) -> (SyncStyle, Subscription) {
    match current_runtime() {
        Some(rt) => rt.use_sync(class_name, state, on_change),
        None => {
            log::warn!("use_sync(`{class_name}`) called without a runtime");
            (SyncStyle::default(), Subscription::noop())
        }
    }
}
