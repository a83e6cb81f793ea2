use super::{Poll, Probe};
use crate::event::observable::{Event, EventType};
use crate::event::ops::*;
use crate::event::subject::{BasicSubject, Subject};
use crate::event::subscription::Subscription;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

impl<A> Poll<A>
where
  A: EventType,
{
  pub fn map<B, F>(&self, map: F) -> Poll<B>
  where
    B: EventType,
    F: Fn(A) -> B + 'static,
  {
    let source = self.clone();
    let map = Rc::new(map);
    Poll::new(move |requests: Event<Probe<B>>| {
      let map = map.clone();
      source.attach(requests.map(move |probe: Probe<B>| {
        let map = map.clone();
        Probe::new(move |a| probe.answer(map(a)))
      }))
    })
  }

  /// Answers only where `map` yields a value
  pub fn filter_map<B, F>(&self, map: F) -> Poll<B>
  where
    B: EventType,
    F: Fn(A) -> Option<B> + 'static,
  {
    let source = self.clone();
    let map = Rc::new(map);
    Poll::new(move |requests: Event<Probe<B>>| {
      let map = map.clone();
      source.attach(requests.map(move |probe: Probe<B>| {
        let map = map.clone();
        Probe::new(move |a| {
          if let Some(b) = map(a) {
            probe.answer(b);
          }
        })
      }))
    })
  }

  /// Every poll of the list answers every request
  pub fn merge(list: Vec<Poll<A>>) -> Poll<A> {
    match list.len() {
      0 => Poll::never(),
      1 => list[0].clone(),
      _ => Poll::new(move |requests: Event<Probe<A>>| {
        Subscription::merge(
          list
            .iter()
            .map(|poll| poll.attach(requests.clone()))
            .collect(),
        )
      }),
    }
  }

  /// Answers only the first answer produced for a given attachment
  pub fn once(&self) -> Poll<A> {
    let source = self.clone();
    Poll::new(move |requests: Event<Probe<A>>| {
      source
        .sample_by(&requests, |a, probe: Probe<A>| (a, probe))
        .once()
        .subscribe(|(a, probe)| probe.answer(a))
    })
  }

  /// Answers whenever `self` answers, combined with the latest answer of
  /// `other`
  pub fn sample_on_left<B, C, F>(&self, other: &Poll<B>, combine: F) -> Poll<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static,
  {
    let (left, right) = (self.clone(), other.clone());
    let combine = Rc::new(combine);
    Poll::new(move |requests: Event<Probe<C>>| {
      let combine = combine.clone();
      let fires = left.sample_by(&requests, |a, probe: Probe<C>| (a, probe));
      let latest = right.sample(&requests);
      fires
        .sample_on_left(&latest, move |(a, probe), b| (combine(a, b), probe))
        .subscribe(|(c, probe)| probe.answer(c))
    })
  }

  /// Answers whenever `other` answers, combined with the latest answer of
  /// `self`
  pub fn sample_on_right<B, C, F>(&self, other: &Poll<B>, combine: F) -> Poll<C>
  where
    B: EventType,
    C: EventType,
    F: Fn(A, B) -> C + 'static,
  {
    let (left, right) = (self.clone(), other.clone());
    let combine = Rc::new(combine);
    Poll::new(move |requests: Event<Probe<C>>| {
      let combine = combine.clone();
      let latest = left.sample(&requests);
      let fires = right.sample_by(&requests, |b, probe: Probe<C>| (b, probe));
      latest
        .sample_on_right(&fires, move |a, (b, probe)| (combine(a, b), probe))
        .subscribe(|(c, probe)| probe.answer(c))
    })
  }
}

impl<A> Poll<Poll<A>>
where
  A: EventType,
{
  /// Flattens a poll of polls
  ///
  /// Each answer of the outer poll is attached to the request that produced
  /// it only. The previous inner attachment is cancelled first.
  pub fn keep_latest(&self) -> Poll<A> {
    let outer = self.clone();
    Poll::new(move |requests: Event<Probe<A>>| {
      let inner: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
      let answers = outer.sample_by(&requests, |poll: Poll<A>, probe: Probe<A>| (poll, probe));
      let outer_subscription = {
        let inner = inner.clone();
        answers.subscribe(move |(poll, probe)| {
          let previous = inner.borrow_mut().take();
          drop(previous);
          let next = poll.attach(Event::now(probe));
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

/// Builds a poll which sees its own answers
///
/// `f` receives a poll standing for the result. Each answer of the result is
/// given to the requester first, then pushed to `f`'s input.
pub fn fix<A, F>(f: F) -> Poll<A>
where
  A: EventType,
  F: Fn(Poll<A>) -> Poll<A> + 'static,
{
  Poll::new(move |requests: Event<Probe<A>>| {
    let internal = BasicSubject::new();
    let looped = f(Poll::from_event(&internal.event()));
    let pusher = internal.pusher();
    looped.attach(requests.map(move |probe: Probe<A>| {
      let pusher = pusher.clone();
      Probe::new(move |a: A| {
        probe.answer(a.clone());
        pusher.invoke(a);
      })
    }))
  })
}

/// A poll made push-driven by [rant]
pub struct Ranted<A>
where
  A: EventType,
{
  pub poll: Poll<A>,
  producer: Rc<RefCell<Option<Subscription>>>,
}

impl<A> Ranted<A>
where
  A: EventType,
{
  /// Stops the source poll from producing into the ranted poll
  pub fn unsubscribe(&self) {
    let producer = self.producer.borrow_mut().take();
    drop(producer);
  }
}

/// Turns a poll into one driven by the answers of its first request
///
/// The source is sampled once, with the very first request. Every answer it
/// produces from then on is pushed to all requests made so far, each answered
/// through its latest probe. Requests never sample the source again.
///
/// # Example
/// ```
/// use cadence::event::subject::{BasicSubject, Subject};
/// use cadence::poll::{rant, Poll};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let values = BasicSubject::new();
/// let ranted = rant(&Poll::from_event(&values.event()));
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let (a, b) = (seen.clone(), seen.clone());
/// let _first = ranted.poll.sample_now().subscribe(move |x| a.borrow_mut().push(("first", x)));
/// let _second = ranted.poll.sample_now().subscribe(move |x| b.borrow_mut().push(("second", x)));
/// values.push(1);
/// ranted.unsubscribe();
/// values.push(2);
/// assert_eq!(*seen.borrow(), [("first", 1), ("second", 1)]);
/// ```
pub fn rant<A>(source: &Poll<A>) -> Ranted<A>
where
  A: EventType,
{
  let produced = BasicSubject::new();
  let started = Rc::new(Cell::new(false));
  let producer: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
  let poll = {
    let (source, producer) = (source.clone(), producer.clone());
    Poll::new(move |requests: Event<Probe<A>>| {
      if !started.replace(true) {
        let subscription = source.sample(&requests.once()).subscribe_invoker(produced.pusher());
        let replaced = producer.borrow_mut().replace(subscription);
        drop(replaced);
      }
      requests
        .sample_on_right(&produced.event(), |probe: Probe<A>, a: A| (probe, a))
        .subscribe(|(probe, a)| probe.answer(a))
    })
  };
  Ranted { poll, producer }
}

/// Buffers what the source answers while its first request is being set up
///
/// On the first request the source is sampled once and every answer is
/// buffered. Each request then stops the producer and replays the buffer, in
/// order, through its probe.
pub fn deflect<A>(source: &Poll<A>) -> Poll<A>
where
  A: EventType,
{
  let source = source.clone();
  let buffer: Rc<RefCell<Vec<A>>> = Rc::new(RefCell::new(Vec::new()));
  let started = Rc::new(Cell::new(false));
  let producer: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
  Poll::new(move |requests: Event<Probe<A>>| {
    if !started.replace(true) {
      let buffer = buffer.clone();
      let subscription = source
        .sample(&requests.once())
        .subscribe(move |a| buffer.borrow_mut().push(a));
      let replaced = producer.borrow_mut().replace(subscription);
      drop(replaced);
    }
    let (buffer, producer) = (buffer.clone(), producer.clone());
    requests.subscribe(move |probe: Probe<A>| {
      let stopped = producer.borrow_mut().take();
      drop(stopped);
      let replay = buffer.borrow().clone();
      for a in replay.into_iter() {
        probe.answer(a);
      }
    })
  })
}

/// A poll with a push side, see [create]
pub struct PollSource<A>
where
  A: EventType,
{
  pub poll: Poll<A>,
  subject: BasicSubject<A>,
  ranted: Ranted<A>,
}

impl<A> PollSource<A>
where
  A: EventType,
{
  pub fn push(&self, value: A) {
    self.subject.push(value);
  }

  /// Stops every request of the poll from receiving later pushes
  pub fn close(&self) {
    self.ranted.unsubscribe();
  }
}

/// Creates a poll which answers every request made so far with each pushed
/// value
pub fn create<A>() -> PollSource<A>
where
  A: EventType,
{
  let subject = BasicSubject::new();
  let ranted = rant(&Poll::from_event(&subject.event()));
  PollSource {
    poll: ranted.poll.clone(),
    subject,
    ranted,
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::Recorder;

  #[test]
  fn map_filter_map_test() {
    let recorder = Recorder::new();
    let _subscription = Poll::pure(4)
      .map(|x| x * 2)
      .filter_map(|x| if x > 5 { Some(x.to_string()) } else { None })
      .sample_now()
      .subscribe(recorder.sink());
    assert_eq!(recorder.values(), ["8"]);
  }

  #[test]
  fn merge_test() {
    let recorder = Recorder::new();
    let _subscription = Poll::merge(vec![Poll::pure(1), Poll::pure(2)])
      .sample_now()
      .subscribe(recorder.sink());
    assert_eq!(recorder.values(), [1, 2]);
  }

  #[test]
  fn once_test() {
    let source = BasicSubject::new();
    let requests = BasicSubject::new();
    let recorder = Recorder::new();
    let _subscription = Poll::from_event(&source.event())
      .once()
      .sample(&requests.event())
      .subscribe(recorder.sink());
    requests.push(());
    source.push(1);
    source.push(2);
    requests.push(());
    source.push(3);
    assert_eq!(recorder.values(), [1]);
  }

  #[test]
  fn sample_on_right_test() {
    let left = BasicSubject::new();
    let right = BasicSubject::new();
    let recorder = Recorder::new();
    let _subscription = Poll::from_event(&left.event())
      .sample_on_right(&Poll::from_event(&right.event()), |a: i32, b: i32| a * b)
      .sample_now()
      .subscribe(recorder.sink());
    right.push(1);
    left.push(2);
    right.push(3);
    assert_eq!(recorder.values(), [6]);
  }

  #[test]
  fn sample_on_left_test() {
    let left = BasicSubject::new();
    let right = BasicSubject::new();
    let recorder = Recorder::new();
    let _subscription = Poll::from_event(&left.event())
      .sample_on_left(&Poll::from_event(&right.event()), |a: i32, b: i32| a - b)
      .sample_now()
      .subscribe(recorder.sink());
    left.push(10);
    right.push(1);
    left.push(20);
    assert_eq!(recorder.values(), [19]);
  }

  #[test]
  fn keep_latest_test() {
    let outer = BasicSubject::new();
    let (first, second) = (BasicSubject::new(), BasicSubject::new());
    let recorder = Recorder::new();
    let _subscription = Poll::from_event(&outer.event())
      .keep_latest()
      .sample_now()
      .subscribe(recorder.sink());
    outer.push(Poll::from_event(&first.event()));
    first.push(1);
    outer.push(Poll::from_event(&second.event()));
    first.push(2);
    second.push(3);
    assert_eq!(recorder.values(), [1, 3]);
    assert_eq!(first.num_subscribers(), 0);
  }

  #[test]
  fn fix_answers_before_feedback_test() {
    let source = BasicSubject::new();
    let order = Recorder::new();
    let feedback = order.clone();
    let input = source.event();
    let poll = fix(move |me: Poll<i32>| {
      let feedback = feedback.clone();
      me.sample_now()
        .subscribe(move |x| feedback.push(format!("fed {}", x)))
        .dangling();
      Poll::from_event(&input)
    });
    let answered = order.clone();
    let _subscription = poll
      .sample_now()
      .subscribe(move |x| answered.push(format!("answered {}", x)));
    source.push(1);
    assert_eq!(order.values(), ["answered 1", "fed 1"]);
  }

  #[test]
  fn rant_samples_source_once_test() {
    let reads = Rc::new(Cell::new(0));
    let counter = reads.clone();
    let ranted = rant(&Poll::from_fn(move || {
      counter.set(counter.get() + 1);
      counter.get()
    }));
    let recorder = Recorder::new();
    let _first = ranted.poll.sample_now().subscribe(recorder.sink());
    let _second = ranted.poll.sample_now().subscribe(recorder.sink());
    assert_eq!(reads.get(), 1);
    assert!(recorder.is_empty());
  }

  #[test]
  fn deflect_replays_buffer_test() {
    let recorder = Recorder::new();
    let deflected = deflect(&Poll::merge(vec![Poll::pure(1), Poll::pure(2)]));
    let _first = deflected.sample_now().subscribe(recorder.sink());
    let _second = deflected.sample_now().subscribe(recorder.sink());
    assert_eq!(recorder.values(), [1, 2, 1, 2]);
  }

  #[test]
  fn create_test() {
    let source = create();
    let recorder = Recorder::new();
    let _subscription = source.poll.sample_now().subscribe(recorder.sink());
    source.push("a".to_owned());
    source.push("b".to_owned());
    source.close();
    source.push("c".to_owned());
    assert_eq!(recorder.values(), ["a", "b"]);
  }
}
