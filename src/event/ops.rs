use super::cell::Latest;
use super::dispatcher::Invoker;
use super::observable::{Event, EventType};
use super::subject::{BasicSubject, Subject};
use super::subscription::Subscription;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub trait Map<A, B>
where
  A: EventType,
  B: EventType,
{
  /// Transforms every value of the event
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
  fn map<F>(&self, map: F) -> Event<B>
  where
    F: Fn(A) -> B + 'static;
}

impl<A, B> Map<A, B> for Event<A>
where
  A: EventType,
  B: EventType,
{
  fn map<F>(&self, map: F) -> Event<B>
  where
    F: Fn(A) -> B + 'static,
  {
    let source = self.clone();
    let map = Rc::new(map);
    Event::new(move |invoker: Invoker<B>| {
      let map = map.clone();
      source.subscribe(move |x| invoker.invoke(map(x)))
    })
  }
}

pub trait Filter<T>
where
  T: EventType,
{
  /// Passes on only the values which satisfy `predicate`
  ///
  /// # Example
  /// ```
  /// use cadence::event::observable::Event;
  /// use cadence::event::ops::*;
  ///
  /// let _subscription = Event::of(vec![1, 2, 3, 4, 5, 6])
  ///   .filter(|x| x % 2 == 0)
  ///   .assert(|x| x % 2 == 0)
  ///   .assert_count(3)
  ///   .subscribe(|_| {});
  /// ```
  fn filter<F>(&self, predicate: F) -> Event<T>
  where
    F: Fn(&T) -> bool + 'static;
}

impl<T> Filter<T> for Event<T>
where
  T: EventType,
{
  fn filter<F>(&self, predicate: F) -> Event<T>
  where
    F: Fn(&T) -> bool + 'static,
  {
    let source = self.clone();
    let predicate = Rc::new(predicate);
    Event::new(move |invoker: Invoker<T>| {
      let predicate = predicate.clone();
      source.subscribe(move |x| {
        if predicate(&x) {
          invoker.invoke(x);
        }
      })
    })
  }
}

pub trait FilterMap<A, B>
where
  A: EventType,
  B: EventType,
{
  /// Maps and filters in one step, dropping every `None`
  fn filter_map<F>(&self, map: F) -> Event<B>
  where
    F: Fn(A) -> Option<B> + 'static;
}

impl<A, B> FilterMap<A, B> for Event<A>
where
  A: EventType,
  B: EventType,
{
  fn filter_map<F>(&self, map: F) -> Event<B>
  where
    F: Fn(A) -> Option<B> + 'static,
  {
    let source = self.clone();
    let map = Rc::new(map);
    Event::new(move |invoker: Invoker<B>| {
      let map = map.clone();
      source.subscribe(move |x| {
        if let Some(y) = map(x) {
          invoker.invoke(y);
        }
      })
    })
  }
}

pub trait Tap<T>
where
  T: EventType,
{
  /// Runs a side effect for every value and passes the value on unchanged
  fn tap<F>(&self, tap: F) -> Event<T>
  where
    F: Fn(&T) + 'static;
}

impl<T> Tap<T> for Event<T>
where
  T: EventType,
{
  fn tap<F>(&self, tap: F) -> Event<T>
  where
    F: Fn(&T) + 'static,
  {
    let source = self.clone();
    let tap = Rc::new(tap);
    Event::new(move |invoker: Invoker<T>| {
      let tap = tap.clone();
      source.subscribe(move |x| {
        tap(&x);
        invoker.invoke(x);
      })
    })
  }
}

pub trait Once<T>
where
  T: EventType,
{
  /// Passes on the first value only, then releases the upstream subscription
  ///
  /// Each subscriber gets its own first value. If the upstream fires while
  /// it is being subscribed to, the upstream subscription is released as soon
  /// as the subscribe call returns.
  ///
  /// # Example
  /// ```
  /// use cadence::event::subject::{BasicSubject, Subject};
  /// use cadence::event::ops::*;
  /// use std::cell::RefCell;
  /// use std::rc::Rc;
  ///
  /// let subject = BasicSubject::new();
  /// let seen = Rc::new(RefCell::new(Vec::new()));
  /// let capture = seen.clone();
  /// let _subscription = subject.event().once().subscribe(move |x| capture.borrow_mut().push(x));
  /// subject.push(1);
  /// subject.push(2);
  /// assert_eq!(*seen.borrow(), [1]);
  /// assert_eq!(subject.num_subscribers(), 0);
  /// ```
  fn once(&self) -> Event<T>;
}

impl<T> Once<T> for Event<T>
where
  T: EventType,
{
  fn once(&self) -> Event<T> {
    let source = self.clone();
    Event::new(move |invoker: Invoker<T>| {
      let fired = Rc::new(Cell::new(false));
      let upstream: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
      let subscription = {
        let (fired, upstream) = (fired.clone(), upstream.clone());
        source.subscribe(move |x| {
          if fired.replace(true) {
            return;
          }
          invoker.invoke(x);
          let released = upstream.borrow_mut().take();
          drop(released);
        })
      };
      if fired.get() {
        drop(subscription);
      } else {
        *upstream.borrow_mut() = Some(subscription);
      }
      Subscription::new(move || {
        let released = upstream.borrow_mut().take();
        drop(released);
      })
    })
  }
}

pub trait KeepLatest<T>
where
  T: EventType,
{
  /// Flattens an event of events, listening only to the most recent inner
  /// event
  ///
  /// Each time the outer event fires, the previous inner subscription is
  /// released before the new inner event is subscribed to. Unsubscribing
  /// releases the inner subscription, then the outer one.
  fn keep_latest(&self) -> Event<T>;
}

impl<T> KeepLatest<T> for Event<Event<T>>
where
  T: EventType,
{
  fn keep_latest(&self) -> Event<T> {
    let outer = self.clone();
    Event::new(move |invoker: Invoker<T>| {
      let inner: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
      let outer_subscription = {
        let inner = inner.clone();
        outer.subscribe(move |event: Event<T>| {
          let previous = inner.borrow_mut().take();
          drop(previous);
          let next = event.subscribe_invoker(invoker.clone());
          let replaced = inner.borrow_mut().replace(next);
          drop(replaced);
        })
      };
      Subscription::new(move || {
        let released = inner.borrow_mut().take();
        drop(released);
        drop(outer_subscription);
      })
    })
  }
}

pub trait Sample<A>
where
  A: EventType,
{
  /// Fires when `self` fires, pairing the value with the latest value of
  /// `other`
  ///
  /// Values of `self` are dropped until `other` has fired at least once.
  fn sample_on_left<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static;

  /// Fires when `other` fires, pairing its value with the latest value of
  /// `self`
  ///
  /// # Example
  /// ```
  /// use cadence::event::subject::{BasicSubject, Subject};
  /// use cadence::event::ops::*;
  /// use std::cell::RefCell;
  /// use std::rc::Rc;
  ///
  /// let (state, clicks) = (BasicSubject::new(), BasicSubject::new());
  /// let seen = Rc::new(RefCell::new(Vec::new()));
  /// let capture = seen.clone();
  /// let _subscription = state
  ///   .event()
  ///   .sample_on_right(&clicks.event(), |s: i32, c: i32| s * c)
  ///   .subscribe(move |x| capture.borrow_mut().push(x));
  /// clicks.push(1);
  /// state.push(10);
  /// clicks.push(2);
  /// clicks.push(3);
  /// assert_eq!(*seen.borrow(), [20, 30]);
  /// ```
  fn sample_on_right<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static;

  /// Fires when either side fires, once both sides have a latest value
  fn bi_sample_on<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static;
}

impl<A> Sample<A> for Event<A>
where
  A: EventType,
{
  fn sample_on_left<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static,
  {
    let (left, right) = (self.clone(), other.clone());
    let combine = Rc::new(combine);
    Event::new(move |invoker: Invoker<C>| {
      let latest = Rc::new(Latest::<B>::new());
      let fires = {
        let (latest, combine) = (latest.clone(), combine.clone());
        left.subscribe(move |a| {
          if let Some(b) = latest.get() {
            invoker.invoke(combine(a, b));
          }
        })
      };
      let records = right.subscribe(move |b| latest.set(b));
      fires.and(records)
    })
  }

  fn sample_on_right<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static,
  {
    let (left, right) = (self.clone(), other.clone());
    let combine = Rc::new(combine);
    Event::new(move |invoker: Invoker<C>| {
      let latest = Rc::new(Latest::<A>::new());
      let records = {
        let latest = latest.clone();
        left.subscribe(move |a| latest.set(a))
      };
      let combine = combine.clone();
      let fires = right.subscribe(move |b| {
        if let Some(a) = latest.get() {
          invoker.invoke(combine(a, b));
        }
      });
      records.and(fires)
    })
  }

  fn bi_sample_on<B, C, F>(&self, other: &Event<B>, combine: F) -> Event<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static,
  {
    let (left, right) = (self.clone(), other.clone());
    let combine = Rc::new(combine);
    Event::new(move |invoker: Invoker<C>| {
      let latest_left = Rc::new(Latest::<A>::new());
      let latest_right = Rc::new(Latest::<B>::new());
      let on_left = {
        let (latest_left, latest_right) = (latest_left.clone(), latest_right.clone());
        let (combine, invoker) = (combine.clone(), invoker.clone());
        left.subscribe(move |a: A| {
          latest_left.set(a.clone());
          if let Some(b) = latest_right.get() {
            invoker.invoke(combine(a, b));
          }
        })
      };
      let combine = combine.clone();
      let on_right = right.subscribe(move |b: B| {
        latest_right.set(b.clone());
        if let Some(a) = latest_left.get() {
          invoker.invoke(combine(a, b));
        }
      });
      on_left.and(on_right)
    })
  }
}

/// Builds an event which feeds its own output back into itself
///
/// `f` receives an event standing for the result and returns the result.
/// Every value the result produces is delivered downstream first, then made
/// visible to `f`'s input.
///
/// # Example
/// ```
/// use cadence::event::subject::{BasicSubject, Subject};
/// use cadence::event::ops::*;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let increments = BasicSubject::new();
/// let source = increments.event();
/// let running = fix(move |total: cadence::event::observable::Event<i32>| {
///   let seeded = cadence::event::observable::Event::merge(vec![total, source.once().map(|_| 0)]);
///   seeded.sample_on_right(&source, |acc, x| acc + x)
/// });
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let capture = seen.clone();
/// let _subscription = running.subscribe(move |x| capture.borrow_mut().push(x));
/// increments.push(1);
/// increments.push(2);
/// assert_eq!(*seen.borrow(), [1, 3]);
/// ```
pub fn fix<T, F>(f: F) -> Event<T>
where
  T: EventType,
  F: Fn(Event<T>) -> Event<T> + 'static,
{
  Event::new(move |invoker: Invoker<T>| {
    let internal = BasicSubject::new();
    let looped = f(internal.event());
    let output = internal.event().subscribe_invoker(invoker);
    let feedback = looped.subscribe_invoker(internal.pusher());
    feedback.and(output)
  })
}

pub trait Fold<A>
where
  A: EventType,
{
  /// Accumulates a running value, emitting it after every value of the event
  ///
  /// # Example
  /// ```
  /// use cadence::event::observable::Event;
  /// use cadence::event::ops::*;
  /// use std::cell::RefCell;
  /// use std::rc::Rc;
  /// use cadence::event::subject::{BasicSubject, Subject};
  ///
  /// let subject = BasicSubject::new();
  /// let seen = Rc::new(RefCell::new(Vec::new()));
  /// let capture = seen.clone();
  /// let _subscription = subject
  ///   .event()
  ///   .fold(|acc: i32, x: i32| acc + x, 10)
  ///   .subscribe(move |x| capture.borrow_mut().push(x));
  /// subject.push(1);
  /// subject.push(2);
  /// assert_eq!(*seen.borrow(), [11, 13]);
  /// ```
  fn fold<B, F>(&self, f: F, seed: B) -> Event<B>
  where
    B: EventType,
    F: Fn(B, A) -> B + 'static;
}

impl<A> Fold<A> for Event<A>
where
  A: EventType,
{
  fn fold<B, F>(&self, f: F, seed: B) -> Event<B>
  where
    B: EventType,
    F: Fn(B, A) -> B + 'static,
  {
    let source = self.clone();
    let f = Rc::new(f);
    fix(move |accumulated: Event<B>| {
      let seed = seed.clone();
      let seeded = Event::merge(vec![accumulated, source.once().map(move |_| seed.clone())]);
      let f = f.clone();
      seeded.sample_on_right(&source, move |acc, x| f(acc, x))
    })
  }
}

pub trait Assert<T>
where
  T: EventType,
{
  /// Panics if a value fails `test`, otherwise passes it on
  fn assert<F>(&self, test: F) -> Event<T>
  where
    F: Fn(&T) -> bool + 'static;

  /// Panics at unsubscribe time unless exactly `count` values passed through
  fn assert_count(&self, count: usize) -> Event<T>;
}

impl<T> Assert<T> for Event<T>
where
  T: EventType,
{
  fn assert<F>(&self, test: F) -> Event<T>
  where
    F: Fn(&T) -> bool + 'static,
  {
    self.tap(move |x| assert!(test(x)))
  }

  fn assert_count(&self, count: usize) -> Event<T> {
    let source = self.clone();
    Event::new(move |invoker: Invoker<T>| {
      let counter = Rc::new(Cell::new(0));
      let cloned = counter.clone();
      source
        .subscribe(move |x| {
          cloned.set(cloned.get() + 1);
          invoker.invoke(x);
        })
        .finalize(move || {
          let counted = counter.get();
          if !std::thread::panicking() {
            assert_eq!(
              counted, count,
              "assertion failed: `event.assert_count({})`\ncounted: `{}`",
              count, counted
            );
          }
        })
    })
  }
}

pub trait Dangling<T>
where
  T: EventType,
{
  /// Subscribes with a no-op consumer and leaves the chain running
  fn dangling(&self);
}

impl<T> Dangling<T> for Event<T>
where
  T: EventType,
{
  fn dangling(&self) {
    self.subscribe(|_| {}).dangling();
  }
}
