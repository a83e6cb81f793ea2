use super::observable::EventType;
use super::subscription::Subscription;
use log::trace;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

type InvokerFn<T> = dyn Fn(T);

/// A shared callback receiving the values of an event
pub struct Invoker<T> {
  func: Rc<InvokerFn<T>>,
}

impl<T> Clone for Invoker<T> {
  fn clone(&self) -> Self {
    Invoker {
      func: self.func.clone(),
    }
  }
}

impl<T> Invoker<T> {
  pub fn new<F>(func: F) -> Self
  where
    F: Fn(T) + 'static,
  {
    Invoker {
      func: Rc::new(func),
    }
  }

  pub fn invoke(&self, input: T) {
    (self.func)(input)
  }
}

pub(super) struct DispatchTarget<T> {
  id: usize,
  live: Rc<Cell<bool>>,
  invoker: Invoker<T>,
}

impl<T> Clone for DispatchTarget<T> {
  fn clone(&self) -> Self {
    DispatchTarget {
      id: self.id,
      live: self.live.clone(),
      invoker: self.invoker.clone(),
    }
  }
}

struct DispatchState<T> {
  // Copied on write while a dispatch holds a snapshot of it.
  targets: Rc<Vec<DispatchTarget<T>>>,
  pending: Vec<DispatchTarget<T>>,
  queue: VecDeque<T>,
  dispatching: bool,
  generation: u64,
  next_id: usize,
}

impl<T> DispatchState<T> {
  fn commit(&mut self) {
    let pending = std::mem::take(&mut self.pending);
    let targets = Rc::make_mut(&mut self.targets);
    targets.retain(|target| target.live.get());
    targets.extend(pending.into_iter().filter(|target| target.live.get()));
    self.generation += 1;
  }
}

/// The subscriber table behind a subject
///
/// Each dispatch walks a snapshot of the subscribers taken when it started.
/// Subscribers added while a dispatch is running join when it commits and do
/// not see the value in flight. Subscribers removed while a dispatch is
/// running are skipped immediately. Values pushed from inside a subscriber
/// are queued and delivered in order once the current value has reached every
/// subscriber in its snapshot.
pub(super) struct Dispatcher<T> {
  state: RefCell<DispatchState<T>>,
}

struct DispatchGuard<'a, T> {
  dispatcher: &'a Dispatcher<T>,
}

impl<'a, T> Drop for DispatchGuard<'a, T> {
  fn drop(&mut self) {
    let mut state = self.dispatcher.state.borrow_mut();
    state.dispatching = false;
    if std::thread::panicking() {
      state.queue.clear();
      state.commit();
    }
  }
}

impl<T> Dispatcher<T>
where
  T: EventType,
{
  pub fn new() -> Rc<Self> {
    Rc::new(Dispatcher {
      state: RefCell::new(DispatchState {
        targets: Rc::new(Vec::new()),
        pending: Vec::new(),
        queue: VecDeque::new(),
        dispatching: false,
        generation: 0,
        next_id: 0,
      }),
    })
  }

  pub fn add_child(self: &Rc<Self>, invoker: Invoker<T>) -> Subscription {
    let live = Rc::new(Cell::new(true));
    let id = {
      let mut state = self.state.borrow_mut();
      let id = state.next_id;
      state.next_id += 1;
      let target = DispatchTarget {
        id,
        live: live.clone(),
        invoker,
      };
      if state.dispatching {
        state.pending.push(target);
      } else {
        Rc::make_mut(&mut state.targets).push(target);
      }
      id
    };
    let dispatcher = Rc::downgrade(self);
    Subscription::new(move || {
      live.set(false);
      if let Some(dispatcher) = dispatcher.upgrade() {
        dispatcher.remove_child(id);
      }
    })
  }

  fn remove_child(&self, id: usize) {
    // The removed target is dropped after the borrow is released since its
    // callback may own further subscriptions.
    let removed = {
      let mut state = self.state.borrow_mut();
      let mut removed: Vec<DispatchTarget<T>> = Vec::new();
      if let Some(idx) = state.pending.iter().position(|target| target.id == id)
      {
        removed.push(state.pending.remove(idx));
      }
      if !state.dispatching {
        let targets = Rc::make_mut(&mut state.targets);
        if let Some(idx) = targets.iter().position(|target| target.id == id) {
          removed.push(targets.remove(idx));
        }
      }
      removed
    };
    drop(removed);
  }

  pub fn dispatch(&self, value: T) {
    {
      let mut state = self.state.borrow_mut();
      if state.dispatching {
        trace!(
          "queueing re-entrant value behind generation {}",
          state.generation
        );
        state.queue.push_back(value);
        return;
      }
      state.dispatching = true;
    }
    let _guard = DispatchGuard { dispatcher: self };
    let mut next = Some(value);
    while let Some(value) = next {
      let snapshot = self.state.borrow().targets.clone();
      for target in snapshot.iter() {
        if target.live.get() {
          target.invoker.invoke(value.clone());
        }
      }
      drop(snapshot);
      let mut state = self.state.borrow_mut();
      state.commit();
      next = state.queue.pop_front();
    }
  }

  pub fn num_children(&self) -> usize {
    let state = self.state.borrow();
    state
      .targets
      .iter()
      .chain(state.pending.iter())
      .filter(|target| target.live.get())
      .count()
  }

  pub fn generation(&self) -> u64 {
    self.state.borrow().generation
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn recorder() -> (Rc<RefCell<Vec<i32>>>, Invoker<i32>) {
    let values = Rc::new(RefCell::new(Vec::new()));
    let capture = values.clone();
    (values, Invoker::new(move |x| capture.borrow_mut().push(x)))
  }

  #[test]
  fn dispatch_order_test() {
    let dispatcher = Dispatcher::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = (order.clone(), order.clone());
    let _first = dispatcher.add_child(Invoker::new(move |x: i32| a.borrow_mut().push(("a", x))));
    let _second = dispatcher.add_child(Invoker::new(move |x: i32| b.borrow_mut().push(("b", x))));
    dispatcher.dispatch(1);
    assert_eq!(*order.borrow(), [("a", 1), ("b", 1)]);
    assert_eq!(dispatcher.generation(), 1);
  }

  #[test]
  fn subscribe_during_dispatch_test() {
    let dispatcher = Dispatcher::new();
    let (late_values, late) = recorder();
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let (capture, weak) = (slot.clone(), Rc::downgrade(&dispatcher));
    let _trigger = dispatcher.add_child(Invoker::new(move |_: i32| {
      if capture.borrow().is_none() {
        if let Some(dispatcher) = weak.upgrade() {
          let subscription = dispatcher.add_child(late.clone());
          *capture.borrow_mut() = Some(subscription);
        }
      }
    }));
    dispatcher.dispatch(1);
    assert!(late_values.borrow().is_empty());
    dispatcher.dispatch(2);
    assert_eq!(*late_values.borrow(), [2]);
  }

  #[test]
  fn unsubscribe_during_dispatch_test() {
    let dispatcher = Dispatcher::new();
    let (values, invoker) = recorder();
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let capture = victim.clone();
    let _killer = dispatcher.add_child(Invoker::new(move |_: i32| {
      let taken = capture.borrow_mut().take();
      drop(taken);
    }));
    *victim.borrow_mut() = Some(dispatcher.add_child(invoker));
    dispatcher.dispatch(1);
    dispatcher.dispatch(2);
    assert!(values.borrow().is_empty());
    assert_eq!(dispatcher.num_children(), 1);
  }

  #[test]
  fn reentrant_dispatch_test() {
    let dispatcher = Dispatcher::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    let (a, b, weak) = (order.clone(), order.clone(), Rc::downgrade(&dispatcher));
    let _first = dispatcher.add_child(Invoker::new(move |x: i32| {
      a.borrow_mut().push(("a", x));
      if x == 1 {
        if let Some(dispatcher) = weak.upgrade() {
          dispatcher.dispatch(2);
        }
      }
    }));
    let _second = dispatcher.add_child(Invoker::new(move |x: i32| b.borrow_mut().push(("b", x))));
    dispatcher.dispatch(1);
    assert_eq!(*order.borrow(), [("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
    assert_eq!(dispatcher.generation(), 2);
  }
}
