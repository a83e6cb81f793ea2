//! Addressed delivery: one shared table of listeners keyed by address.
use crate::event::dispatcher::Invoker;
use crate::event::observable::{Event, EventType};
use crate::event::subscription::Subscription;
use crate::poll::Poll;
use log::trace;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;

struct Postbox<V> {
  id: usize,
  live: Rc<Cell<bool>>,
  invoker: Invoker<V>,
}

impl<V> Clone for Postbox<V> {
  fn clone(&self) -> Self {
    Postbox {
      id: self.id,
      live: self.live.clone(),
      invoker: self.invoker.clone(),
    }
  }
}

struct Boxes<K, V> {
  addresses: BTreeMap<K, Vec<Postbox<V>>>,
  next_id: usize,
}

/// Delivers each payload to the listeners of one address
///
/// Listeners of an address are called in registration order. Pushing to an
/// address nobody listens to does nothing: payloads are never buffered.
///
/// # Example
/// ```
/// use cadence::mailbox::Mailbox;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let mailbox = Mailbox::new();
/// mailbox.push(&1, "lost");
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let capture = seen.clone();
/// let _subscription = mailbox.event(1).subscribe(move |x| capture.borrow_mut().push(x));
/// mailbox.push(&2, "elsewhere");
/// mailbox.push(&1, "delivered");
/// assert_eq!(*seen.borrow(), ["delivered"]);
/// ```
pub struct Mailbox<K, V> {
  boxes: Rc<RefCell<Boxes<K, V>>>,
}

impl<K, V> Clone for Mailbox<K, V> {
  fn clone(&self) -> Self {
    Mailbox {
      boxes: self.boxes.clone(),
    }
  }
}

impl<K, V> Default for Mailbox<K, V>
where
  K: Ord + Clone + Debug + 'static,
  V: EventType,
{
  fn default() -> Self {
    Mailbox {
      boxes: Rc::new(RefCell::new(Boxes {
        addresses: BTreeMap::new(),
        next_id: 0,
      })),
    }
  }
}

impl<K, V> Mailbox<K, V>
where
  K: Ord + Clone + Debug + 'static,
  V: EventType,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// The payloads sent to `address`
  pub fn event(&self, address: K) -> Event<V> {
    let boxes = Rc::downgrade(&self.boxes);
    Event::new(move |invoker: Invoker<V>| {
      let boxes = match boxes.upgrade() {
        Some(boxes) => boxes,
        None => return Subscription::empty(),
      };
      let live = Rc::new(Cell::new(true));
      let id = {
        let mut guard = boxes.borrow_mut();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.addresses.entry(address.clone()).or_default().push(Postbox {
          id,
          live: live.clone(),
          invoker,
        });
        id
      };
      let (boxes, address) = (Rc::downgrade(&boxes), address.clone());
      Subscription::new(move || {
        live.set(false);
        if let Some(boxes) = boxes.upgrade() {
          let removed = {
            let mut guard = boxes.borrow_mut();
            let mut removed = None;
            if let Some(list) = guard.addresses.get_mut(&address) {
              if let Some(idx) = list.iter().position(|postbox| postbox.id == id) {
                removed = Some(list.remove(idx));
              }
              if list.is_empty() {
                guard.addresses.remove(&address);
              }
            }
            removed
          };
          drop(removed);
        }
      })
    })
  }

  /// The payloads sent to `address`, as a poll
  pub fn poll(&self, address: K) -> Poll<V> {
    Poll::from_event(&self.event(address))
  }

  pub fn push(&self, address: &K, payload: V) {
    let snapshot = self.boxes.borrow().addresses.get(address).cloned();
    match snapshot {
      Some(list) => {
        for postbox in list.iter() {
          if postbox.live.get() {
            postbox.invoker.invoke(payload.clone());
          }
        }
      }
      None => trace!("no listeners at {:?}, dropping payload", address),
    }
  }

  pub fn num_listeners(&self, address: &K) -> usize {
    self
      .boxes
      .borrow()
      .addresses
      .get(address)
      .map(|list| list.len())
      .unwrap_or(0)
  }

  /// The number of addresses with at least one listener
  pub fn num_addresses(&self) -> usize {
    self.boxes.borrow().addresses.len()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::Recorder;

  #[test]
  fn push_without_listeners_test() {
    let mailbox: Mailbox<u64, i32> = Mailbox::new();
    mailbox.push(&3, 1);
    assert_eq!(mailbox.num_addresses(), 0);
    let recorder = Recorder::new();
    let _subscription = mailbox.event(3).subscribe(recorder.sink());
    assert!(recorder.is_empty());
  }

  #[test]
  fn registration_order_test() {
    let mailbox = Mailbox::new();
    let recorder = Recorder::new();
    let (a, b) = (recorder.clone(), recorder.clone());
    let _first = mailbox.event("x").subscribe(move |v: i32| a.push(("first", v)));
    let _second = mailbox.event("x").subscribe(move |v: i32| b.push(("second", v)));
    mailbox.push(&"x", 1);
    assert_eq!(recorder.values(), [("first", 1), ("second", 1)]);
    assert_eq!(mailbox.num_listeners(&"x"), 2);
  }

  #[test]
  fn empty_address_pruned_test() {
    let mailbox: Mailbox<u64, ()> = Mailbox::new();
    let first = mailbox.event(1).subscribe(|_| {});
    let second = mailbox.event(1).subscribe(|_| {});
    drop(first);
    assert_eq!(mailbox.num_addresses(), 1);
    drop(second);
    assert_eq!(mailbox.num_addresses(), 0);
  }

  #[test]
  fn unsubscribe_during_push_test() {
    let mailbox = Mailbox::new();
    let recorder = Recorder::new();
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let capture = victim.clone();
    let _killer = mailbox.event(0u64).subscribe(move |_: i32| {
      let taken = capture.borrow_mut().take();
      drop(taken);
    });
    *victim.borrow_mut() = Some(mailbox.event(0).subscribe(recorder.sink()));
    mailbox.push(&0, 5);
    assert!(recorder.is_empty());
    assert_eq!(mailbox.num_listeners(&0), 1);
  }

  #[test]
  fn poll_test() {
    let mailbox = Mailbox::new();
    let recorder = Recorder::new();
    let _subscription = mailbox.poll(9u64).sample_now().subscribe(recorder.sink());
    mailbox.push(&9, "mail".to_owned());
    assert_eq!(recorder.values(), ["mail"]);
  }
}
