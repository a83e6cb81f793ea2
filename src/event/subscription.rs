use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Teardown = Box<dyn FnOnce()>;

struct Inner {
  teardown: RefCell<Option<Teardown>>,
}

impl Inner {
  fn run(&self) {
    // The borrow is released before the teardown runs so that a teardown
    // which reaches this subscription again observes it as finished.
    let teardown = self.teardown.borrow_mut().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  fn active(&self) -> bool {
    self.teardown.borrow().is_some()
  }
}

/// The unsubscribe action returned by every subscription
///
/// A subscription ties a live chain of callbacks to the scope that owns it:
/// dropping it (or calling [unsubscribe](Subscription::unsubscribe))
/// guarantees that the callback receives no further values. Unsubscribing is
/// idempotent and never panics on its own.
///
/// # Example
/// ```
/// use cadence::event::subject::{BasicSubject, Subject};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let subject = BasicSubject::new();
/// let seen = Rc::new(Cell::new(0));
/// let capture = seen.clone();
/// let subscription = subject.event().subscribe(move |x: i32| capture.set(x));
/// subject.push(1);
/// subscription.unsubscribe();
/// subscription.unsubscribe();
/// subject.push(2);
/// assert_eq!(seen.get(), 1);
/// ```
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
  inner: Rc<Inner>,
}

impl Subscription {
  pub fn new<F>(teardown: F) -> Self
  where
    F: FnOnce() + 'static,
  {
    Subscription {
      inner: Rc::new(Inner {
        teardown: RefCell::new(Some(Box::new(teardown))),
      }),
    }
  }

  /// A subscription with nothing to tear down
  pub fn empty() -> Self {
    Subscription {
      inner: Rc::new(Inner {
        teardown: RefCell::new(None),
      }),
    }
  }

  /// Composes subscriptions so that they are cancelled together, in order
  pub fn merge(subscriptions: Vec<Subscription>) -> Self {
    Subscription::new(move || {
      for subscription in subscriptions.into_iter() {
        subscription.unsubscribe();
      }
    })
  }

  pub fn and(self, other: Subscription) -> Self {
    Subscription::merge(vec![self, other])
  }

  pub fn unsubscribe(&self) {
    self.inner.run();
  }

  pub fn active(&self) -> bool {
    self.inner.active()
  }

  /// Returns a non-owning handle which can cancel this subscription from
  /// inside one of its own callbacks
  pub fn handle(&self) -> SubscriptionHandle {
    SubscriptionHandle {
      inner: Rc::downgrade(&self.inner),
    }
  }

  /// Chains a task which runs after the subscription is torn down
  pub fn finalize<F>(self, task: F) -> Self
  where
    F: FnOnce() + 'static,
  {
    Subscription::new(move || {
      self.unsubscribe();
      task();
    })
  }

  /// Consumes the subscription and leaves the chain running for the rest of
  /// the program
  pub fn dangling(self) {
    std::mem::forget(self);
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.unsubscribe();
  }
}

#[derive(Clone)]
pub struct SubscriptionHandle {
  inner: Weak<Inner>,
}

impl SubscriptionHandle {
  pub fn unsubscribe(&self) {
    if let Some(inner) = self.inner.upgrade() {
      inner.run();
    }
  }

  pub fn active(&self) -> bool {
    self
      .inner
      .upgrade()
      .map(|inner| inner.active())
      .unwrap_or(false)
  }
}
