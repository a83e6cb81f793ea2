use std::cell::RefCell;

/// A single-slot cell holding the most recent value seen by an operator
///
/// Sampling operators share one of these between their two subscriptions.
#[derive(Debug)]
pub struct Latest<T> {
  slot: RefCell<Option<T>>,
}

impl<T> Default for Latest<T> {
  fn default() -> Self {
    Latest {
      slot: RefCell::new(None),
    }
  }
}

impl<T> Latest<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&self, value: T) {
    let previous = self.slot.borrow_mut().replace(value);
    drop(previous);
  }

  pub fn take(&self) -> Option<T> {
    self.slot.borrow_mut().take()
  }

  pub fn is_set(&self) -> bool {
    self.slot.borrow().is_some()
  }
}

impl<T> Latest<T>
where
  T: Clone,
{
  pub fn get(&self) -> Option<T> {
    self.slot.borrow().clone()
  }
}
