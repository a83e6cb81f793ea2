//! Polls are continuous values read on demand.
//!
//! A [Poll] never holds a value itself. It is attached to an event of
//! requests, each request carrying a [Probe], and answers every request by
//! calling the probe with its current value, now or later. Sampling a poll
//! with an event therefore produces another event.
//!
//! * `ops` holds the poll combinators and the push-driven adapters
//!   [rant](ops::rant), [deflect](ops::deflect) and [create](ops::create).
//!
pub mod ops;

use crate::event::dispatcher::Invoker;
use crate::event::observable::{Event, EventType};
use crate::event::ops::*;
use crate::event::subscription::Subscription;

use std::rc::Rc;

pub use ops::{create, deflect, fix, rant, PollSource, Ranted};

/// The continuation carried by a poll request
pub struct Probe<A> {
  func: Rc<dyn Fn(A)>,
}

impl<A> Clone for Probe<A> {
  fn clone(&self) -> Self {
    Probe {
      func: self.func.clone(),
    }
  }
}

impl<A> Probe<A> {
  pub fn new<F>(func: F) -> Self
  where
    F: Fn(A) + 'static,
  {
    Probe {
      func: Rc::new(func),
    }
  }

  pub fn answer(&self, value: A) {
    (self.func)(value)
  }
}

type AttachFn<A> = dyn Fn(Event<Probe<A>>) -> Subscription;

/// A time-varying value
///
/// # Example
/// ```
/// use cadence::event::observable::Event;
/// use cadence::poll::Poll;
/// use std::cell::{Cell, RefCell};
/// use std::rc::Rc;
///
/// let counter = Rc::new(Cell::new(0));
/// let reader = counter.clone();
/// let poll = Poll::from_fn(move || reader.get());
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let capture = seen.clone();
/// let _subscription = poll
///   .sample_by(&Event::of(vec!["a", "b"]), |n, tag| format!("{}{}", tag, n))
///   .subscribe(move |x| capture.borrow_mut().push(x));
/// counter.set(5);
/// let _later = poll.sample_now().subscribe(|n| assert_eq!(n, 5));
/// assert_eq!(*seen.borrow(), ["a0", "b0"]);
/// ```
pub struct Poll<A> {
  attach: Rc<AttachFn<A>>,
}

impl<A> Clone for Poll<A> {
  fn clone(&self) -> Self {
    Poll {
      attach: self.attach.clone(),
    }
  }
}

impl<A> Poll<A>
where
  A: EventType,
{
  /// Builds a poll from its attach function
  ///
  /// The function receives the event of requests and returns the
  /// subscription which stops answering them.
  pub fn new<F>(attach: F) -> Self
  where
    F: Fn(Event<Probe<A>>) -> Subscription + 'static,
  {
    Poll {
      attach: Rc::new(attach),
    }
  }

  pub fn attach(&self, requests: Event<Probe<A>>) -> Subscription {
    (self.attach)(requests)
  }

  /// Answers every request with `value` as soon as it is made
  pub fn pure(value: A) -> Self {
    Poll::new(move |requests: Event<Probe<A>>| {
      let value = value.clone();
      requests.subscribe(move |probe| probe.answer(value.clone()))
    })
  }

  /// Answers every request with whatever `getter` returns at request time
  pub fn from_fn<F>(getter: F) -> Self
  where
    F: Fn() -> A + 'static,
  {
    let getter = Rc::new(getter);
    Poll::new(move |requests: Event<Probe<A>>| {
      let getter = getter.clone();
      requests.subscribe(move |probe| probe.answer(getter()))
    })
  }

  /// A poll answering nothing
  pub fn never() -> Self {
    Poll::new(|_| Subscription::empty())
  }

  /// Views an event as a poll
  ///
  /// Each request switches to listening to `event` and is answered with
  /// every later value of it. The previous request stops being answered.
  pub fn from_event(event: &Event<A>) -> Self {
    let event = event.clone();
    Poll::new(move |requests: Event<Probe<A>>| {
      let event = event.clone();
      requests
        .map(move |probe: Probe<A>| event.map(move |a| probe.answer(a)))
        .keep_latest()
        .subscribe(|_| {})
    })
  }

  /// Samples the poll on every value of `requests`, combining the answer
  /// with the request value
  pub fn sample_by<X, B, F>(&self, requests: &Event<X>, combine: F) -> Event<B>
  where
    X: EventType,
    B: EventType,
    F: Fn(A, X) -> B + 'static,
  {
    let poll = self.clone();
    let requests = requests.clone();
    let combine = Rc::new(combine);
    Event::new(move |invoker: Invoker<B>| {
      let combine = combine.clone();
      let probes = requests.map(move |x: X| {
        let (combine, invoker) = (combine.clone(), invoker.clone());
        Probe::new(move |a| invoker.invoke(combine(a, x.clone())))
      });
      poll.attach(probes)
    })
  }

  pub fn sample<X>(&self, requests: &Event<X>) -> Event<A>
  where
    X: EventType,
  {
    self.sample_by(requests, |a, _| a)
  }

  /// Reads the poll once per subscriber, at subscribe time
  pub fn sample_now(&self) -> Event<A> {
    self.sample(&Event::now(()))
  }
}
