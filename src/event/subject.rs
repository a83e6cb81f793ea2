use super::dispatcher::{Dispatcher, Invoker};
use super::observable::{Event, EventType};

use std::cell::RefCell;
use std::rc::Rc;

/// A source of values which can be pushed into by hand
pub trait Subject<T>
where
  T: EventType,
{
  fn event(&self) -> Event<T>;
  fn push(&self, value: T);
}

/// The push-and-event pair at the root of an event chain
///
/// Pushing delivers the value synchronously to every live subscriber in
/// subscription order. Pushing with no subscribers is a no-op. Clones share
/// the same subscriber table.
///
/// # Example
/// ```
/// use cadence::event::subject::{BasicSubject, Subject};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let subject = BasicSubject::new();
/// subject.push(0);
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let capture = seen.clone();
/// let _subscription = subject.event().subscribe(move |x| capture.borrow_mut().push(x));
/// subject.push(1);
/// subject.push(2);
/// assert_eq!(*seen.borrow(), [1, 2]);
/// ```
pub struct BasicSubject<T>
where
  T: EventType,
{
  dispatcher: Rc<Dispatcher<T>>,
}

impl<T> Clone for BasicSubject<T>
where
  T: EventType,
{
  fn clone(&self) -> Self {
    BasicSubject {
      dispatcher: self.dispatcher.clone(),
    }
  }
}

impl<T> Default for BasicSubject<T>
where
  T: EventType,
{
  fn default() -> Self {
    BasicSubject {
      dispatcher: Dispatcher::new(),
    }
  }
}

impl<T> BasicSubject<T>
where
  T: EventType,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the push side as an invoker so it can be handed to
  /// [Event::subscribe_invoker]
  pub fn pusher(&self) -> Invoker<T> {
    let dispatcher = self.dispatcher.clone();
    Invoker::new(move |value| dispatcher.dispatch(value))
  }

  pub fn num_subscribers(&self) -> usize {
    self.dispatcher.num_children()
  }

  /// The number of dispatches committed so far
  pub fn generation(&self) -> u64 {
    self.dispatcher.generation()
  }
}

impl<T> Subject<T> for BasicSubject<T>
where
  T: EventType,
{
  fn event(&self) -> Event<T> {
    let dispatcher = self.dispatcher.clone();
    Event::new(move |invoker| dispatcher.add_child(invoker))
  }

  fn push(&self, value: T) {
    self.dispatcher.dispatch(value);
  }
}

/// A subject which remembers the last pushed value
///
/// Every new subscriber receives the current state while it subscribes, then
/// every later push.
pub struct StateSubject<T>
where
  T: EventType,
{
  state: Rc<RefCell<T>>,
  base: BasicSubject<T>,
}

impl<T> Clone for StateSubject<T>
where
  T: EventType,
{
  fn clone(&self) -> Self {
    StateSubject {
      state: self.state.clone(),
      base: self.base.clone(),
    }
  }
}

impl<T> StateSubject<T>
where
  T: EventType,
{
  pub fn new(value: T) -> Self {
    StateSubject {
      state: Rc::new(RefCell::new(value)),
      base: BasicSubject::new(),
    }
  }

  pub fn state(&self) -> T {
    self.state.borrow().clone()
  }
}

impl<T> Subject<T> for StateSubject<T>
where
  T: EventType,
{
  fn event(&self) -> Event<T> {
    let state = self.state.clone();
    let base = self.base.event();
    Event::new(move |invoker| {
      let current = state.borrow().clone();
      invoker.invoke(current);
      base.subscribe_invoker(invoker)
    })
  }

  fn push(&self, value: T) {
    *self.state.borrow_mut() = value.clone();
    self.base.push(value);
  }
}
