use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Teardown handle for a listener registered on a store, a viewport or a scope.
///
/// Dropping a `Subscription` does nothing; call [`Subscription::unsubscribe`]
/// (or dispose the [`Scope`](crate::Scope) it was attached to).
#[derive(Clone)]
pub struct Subscription(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Subscription {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn unsubscribe(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_active(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Runs `f()` immediately and returns its `Subscription`.
///
/// When called inside [`Scope::run`](crate::Scope::run) the subscription is
/// also torn down when that scope is disposed.
pub fn effect<F>(f: F) -> Subscription
where
    F: FnOnce() -> Subscription,
{
    let sub = f();

    if let Some(scope) = crate::scope::current_scope() {
        let sub2 = sub.clone();
        scope.add_disposer(move || sub2.unsubscribe());
    }

    sub
}
