use super::dispatcher::Invoker;
use super::subscription::Subscription;

use std::rc::Rc;

pub trait EventType: Clone + 'static {}

impl<T> EventType for T where T: Clone + 'static {}

type SubscribeFn<T> = dyn Fn(Invoker<T>) -> Subscription;

/// A push-based source of values
///
/// An event is a description of how to register a callback: nothing happens
/// until [subscribe](Event::subscribe) is called, and every subscription gets
/// its own chain. Values arrive synchronously, in push order, for as long as
/// the returned [Subscription] is alive. An event may fire during the
/// subscribe call itself (see [Event::now]).
///
/// # Example
/// ```
/// use cadence::event::observable::Event;
/// use cadence::event::ops::*;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let capture = seen.clone();
/// let _subscription = Event::of(vec![1, 2, 3])
///   .map(|x| format!("value_{}", x))
///   .subscribe(move |x| capture.borrow_mut().push(x));
/// assert_eq!(*seen.borrow(), ["value_1", "value_2", "value_3"]);
/// ```
pub struct Event<T> {
  subscribe: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Event<T> {
  fn clone(&self) -> Self {
    Event {
      subscribe: self.subscribe.clone(),
    }
  }
}

impl<T> Event<T>
where
  T: EventType,
{
  /// Builds an event from its subscribe function
  ///
  /// The function receives the downstream invoker and returns the
  /// subscription which detaches it. It runs once per subscriber.
  pub fn new<F>(subscribe: F) -> Self
  where
    F: Fn(Invoker<T>) -> Subscription + 'static,
  {
    Event {
      subscribe: Rc::new(subscribe),
    }
  }

  pub fn subscribe<F>(&self, consumer: F) -> Subscription
  where
    F: Fn(T) + 'static,
  {
    self.subscribe_invoker(Invoker::new(consumer))
  }

  pub fn subscribe_invoker(&self, invoker: Invoker<T>) -> Subscription {
    (self.subscribe)(invoker)
  }

  /// An event which never fires
  pub fn never() -> Self {
    EventBuilder::never().build()
  }

  /// Fires `value` to each subscriber while it subscribes
  pub fn now(value: T) -> Self {
    EventBuilder::of(vec![value]).build()
  }

  /// Fires every value of `list`, in order, to each subscriber while it
  /// subscribes
  pub fn of(list: Vec<T>) -> Self {
    EventBuilder::of(list).build()
  }

  /// Funnels a list of events into one
  ///
  /// Subscribing subscribes to every event of the list in order and
  /// unsubscribing releases all of them.
  ///
  /// # Example
  /// ```
  /// use cadence::event::observable::Event;
  /// use std::cell::RefCell;
  /// use std::rc::Rc;
  ///
  /// let seen = Rc::new(RefCell::new(Vec::new()));
  /// let capture = seen.clone();
  /// let _subscription = Event::merge(vec![Event::of(vec![1, 2]), Event::now(3)])
  ///   .subscribe(move |x| capture.borrow_mut().push(x));
  /// assert_eq!(*seen.borrow(), [1, 2, 3]);
  /// ```
  pub fn merge(list: Vec<Event<T>>) -> Self {
    EventBuilder::merge(list).build()
  }
}

enum EventStrategy<T> {
  Never,
  Of(Vec<T>),
  Merge(Vec<Event<T>>),
}

pub struct EventBuilder<T>
where
  T: EventType,
{
  strategy: EventStrategy<T>,
}

impl<T> EventBuilder<T>
where
  T: EventType,
{
  pub fn never() -> Self {
    EventBuilder {
      strategy: EventStrategy::Never,
    }
  }

  /// Builder for an event of constant values, see [this method](Event::of)
  /// for details
  pub fn of(list: Vec<T>) -> Self {
    EventBuilder {
      strategy: EventStrategy::Of(list),
    }
  }

  /// Builder for an event which funnels a list of other events, see
  /// [this method](Event::merge) for details
  pub fn merge(list: Vec<Event<T>>) -> Self {
    EventBuilder {
      strategy: EventStrategy::Merge(list),
    }
  }

  pub fn build(self) -> Event<T> {
    match self.strategy {
      EventStrategy::Never => Event::new(|_| Subscription::empty()),
      EventStrategy::Of(list) => Event::new(move |invoker| {
        for value in list.iter() {
          invoker.invoke(value.clone());
        }
        Subscription::empty()
      }),
      EventStrategy::Merge(list) => match list.len() {
        0 => Event::never(),
        1 => list[0].clone(),
        _ => Event::new(move |invoker| {
          Subscription::merge(
            list
              .iter()
              .map(|event| event.subscribe_invoker(invoker.clone()))
              .collect(),
          )
        }),
      },
    }
  }
}
