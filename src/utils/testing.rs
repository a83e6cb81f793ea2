//! Helpers shared by unit tests, integration tests and doc tests
use std::cell::RefCell;
use std::rc::Rc;
use std::{sync::mpsc, thread, time::Duration};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `f` on a fresh thread and panics if it does not finish within `d`
///
/// Event chains are single threaded, so `f` builds its own chain on the
/// testing thread. This catches propagation loops which would otherwise hang
/// the test run.
pub fn panic_after<T, F>(d: Duration, f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (done_tx, done_rx) = mpsc::channel();
  let handle = thread::Builder::new()
    .name("testing-thread".to_owned())
    .spawn(move || {
      let val = f();
      done_tx.send(()).expect("failed to send complete signal");
      val
    })
    .expect("failed to spawn testing thread");
  match done_rx.recv_timeout(d) {
    Ok(_) => handle.join().expect("thread panicked"),
    Err(error) => match error {
      mpsc::RecvTimeoutError::Timeout => panic!("thread took too long"),
      mpsc::RecvTimeoutError::Disconnected => panic!("thread panicked"),
    },
  }
}

pub fn bounded_context<T, F>(f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  panic_after(DEFAULT_TIMEOUT, f)
}

/// Collects every value it is handed, in order
pub struct Recorder<T> {
  values: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
  fn clone(&self) -> Self {
    Recorder {
      values: self.values.clone(),
    }
  }
}

impl<T> Default for Recorder<T> {
  fn default() -> Self {
    Recorder {
      values: Rc::new(RefCell::new(Vec::new())),
    }
  }
}

impl<T> Recorder<T>
where
  T: Clone + 'static,
{
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, value: T) {
    self.values.borrow_mut().push(value);
  }

  pub fn sink(&self) -> impl Fn(T) + 'static {
    let values = self.values.clone();
    move |value| values.borrow_mut().push(value)
  }

  pub fn values(&self) -> Vec<T> {
    self.values.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.values.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.borrow().is_empty()
  }

  pub fn clear(&self) {
    self.values.borrow_mut().clear();
  }
}
