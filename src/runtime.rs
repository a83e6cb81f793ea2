//! Mounting a description tree onto an interpreter.
//!
//! # Example
//! ```
//! use cadence::event::subject::{BasicSubject, Subject};
//! use cadence::interpret::tree::MemoryTree;
//! use cadence::poll::Poll;
//! use cadence::reconcile::element::Element;
//! use cadence::runtime::RuntimeBuilder;
//!
//! let greeting = BasicSubject::new();
//! let node = Element::new(
//!   "p",
//!   vec![],
//!   vec![Element::text(Poll::from_event(&greeting.event())).into()],
//! )
//! .into();
//! let mut mount = RuntimeBuilder::new()
//!   .root_scope("app")
//!   .build()
//!   .mount(node, MemoryTree::new())
//!   .unwrap();
//! greeting.push("hello".to_owned());
//! assert_eq!(mount.with_interpreter(|tree| tree.render_root()), "<p>hello</p>");
//! mount.unmount().unwrap();
//! assert_eq!(mount.with_interpreter(|tree| tree.len()), 0);
//! ```
use crate::deferred::DeferralPath;
use crate::event::subscription::Subscription;
use crate::interpret::tree::MemoryTree;
use crate::interpret::{Executor, InterpretError, Interpreter};
use crate::reconcile::instruction::{Id, Instruction, Scope};
use crate::reconcile::{flatten, IdSource, Ids, Node, Placement};
use log::{debug, error};

use std::any::Any;
use std::rc::Rc;

pub const DEFAULT_ROOT_SCOPE: &str = "rootScope";

pub struct RuntimeBuilder {
  root_scope: String,
  trace_instructions: bool,
  halt_on_fault: bool,
}

impl Default for RuntimeBuilder {
  fn default() -> Self {
    RuntimeBuilder {
      root_scope: DEFAULT_ROOT_SCOPE.to_owned(),
      trace_instructions: false,
      halt_on_fault: false,
    }
  }
}

impl RuntimeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Names the scope every top-level unit is created in
  pub fn root_scope(mut self, name: &str) -> Self {
    self.root_scope = name.to_owned();
    self
  }

  /// Logs every executed instruction at trace level
  pub fn trace_instructions(mut self, enabled: bool) -> Self {
    self.trace_instructions = enabled;
    self
  }

  /// Drops every instruction that follows the first interpreter fault
  pub fn halt_on_fault(mut self, enabled: bool) -> Self {
    self.halt_on_fault = enabled;
    self
  }

  pub fn build(self) -> Runtime {
    Runtime {
      root_scope: Scope::Local(self.root_scope),
      trace_instructions: self.trace_instructions,
      halt_on_fault: self.halt_on_fault,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Runtime {
  root_scope: Scope,
  trace_instructions: bool,
  halt_on_fault: bool,
}

impl Default for Runtime {
  fn default() -> Self {
    RuntimeBuilder::new().build()
  }
}

impl Runtime {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates the root unit and subscribes the flattened tree under it
  ///
  /// Everything the tree creates is deferred for deletion under a path headed
  /// by a freshly allocated id, so [Mount::unmount] releases all of it. A
  /// fault raised while the initial tree is built unmounts it again and is
  /// returned.
  pub fn mount<I>(&self, node: Node, interpreter: I) -> Result<Mount<I>, InterpretError>
  where
    I: Interpreter + 'static,
  {
    let executor = Rc::new(Executor::new(
      interpreter,
      self.halt_on_fault,
      self.trace_instructions,
    ));
    let head = executor.allocate_id();
    let path = DeferralPath::new(vec![head.0]);
    debug!("mounting in scope {} under {}", self.root_scope, path);
    executor.execute(Instruction::CreateRoot { id: Id::ROOT })?;
    executor.execute(Instruction::defer(
      path.clone(),
      Instruction::DeleteFromCache { id: Id::ROOT },
    ))?;
    let ids: Ids = executor.clone();
    let placement = Placement::root(Id::ROOT, self.root_scope.clone(), path.clone());
    let subscription = flatten(&node, &placement, &ids).subscribe_invoker(executor.invoker());
    let mut mount = Mount {
      executor,
      subscription: Some(subscription),
      path,
    };
    match mount.take_fault() {
      Some(fault) => {
        mount.unmount().ok();
        Err(fault)
      }
      None => Ok(mount),
    }
  }
}

/// A mounted tree
///
/// Dropping it unmounts the tree.
pub struct Mount<I>
where
  I: Interpreter + 'static,
{
  executor: Rc<Executor<I>>,
  subscription: Option<Subscription>,
  path: DeferralPath,
}

impl<I> Mount<I>
where
  I: Interpreter + 'static,
{
  /// Runs every deferred instruction, then stops all reactive updates
  ///
  /// Returns the first fault met while draining, or one raised earlier and
  /// not yet taken. Calling it again does nothing.
  pub fn unmount(&mut self) -> Result<(), InterpretError> {
    let subscription = match self.subscription.take() {
      Some(subscription) => subscription,
      None => return Ok(()),
    };
    debug!("unmounting {}", self.path);
    let drained = self.executor.drain();
    drop(subscription);
    let earlier = self.executor.take_fault();
    drained?;
    match earlier {
      Some(fault) => Err(fault),
      None => Ok(()),
    }
  }

  pub fn is_mounted(&self) -> bool {
    self.subscription.is_some()
  }

  /// Takes the first fault raised by the interpreter since the last call
  pub fn take_fault(&self) -> Option<InterpretError> {
    self.executor.take_fault()
  }

  pub fn is_halted(&self) -> bool {
    self.executor.is_halted()
  }

  /// The number of instructions waiting on a deferral path
  pub fn num_deferred(&self) -> usize {
    self.executor.num_deferred()
  }

  /// The path every deferred instruction of this mount lives under
  pub fn deferral_path(&self) -> &DeferralPath {
    &self.path
  }

  pub fn with_interpreter<R, F>(&self, f: F) -> R
  where
    F: FnOnce(&I) -> R,
  {
    self.executor.with_interpreter(f)
  }

  /// Runs `f` on the backend directly, outside of the instruction stream
  pub fn with_interpreter_mut<R, F>(&self, f: F) -> R
  where
    F: FnOnce(&mut I) -> R,
  {
    self.executor.with_interpreter_mut(f)
  }
}

impl Mount<MemoryTree> {
  /// Calls the callback stored under `key` on unit `id`, as a backend would
  /// when the matching native event happens
  ///
  /// Returns whether a callback was found.
  pub fn fire(&self, id: Id, key: &str, payload: &dyn Any) -> bool {
    match self.with_interpreter(|tree| tree.callback(id, key)) {
      Some(callback) => {
        callback.call(payload);
        true
      }
      None => false,
    }
  }
}

impl<I> Drop for Mount<I>
where
  I: Interpreter + 'static,
{
  fn drop(&mut self) {
    if let Err(fault) = self.unmount() {
      error!("fault while unmounting {}: {}", self.path, fault);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::poll::Poll;
  use crate::reconcile::element::Element;
  use crate::reconcile::instruction::Attribute;

  #[test]
  fn mount_static_tree_test() {
    let node = Element::new(
      "div",
      vec![Poll::pure(Attribute::prop("class", "box"))],
      vec![Element::text_static("a").into(), Element::text_static("b").into()],
    )
    .into();
    let mount = Runtime::new().mount(node, MemoryTree::new()).unwrap();
    assert_eq!(
      mount.with_interpreter(|tree| tree.render_root()),
      "<div class=\"box\">ab</div>"
    );
    // The root and three units wait for deletion.
    assert_eq!(mount.num_deferred(), 4);
    assert_eq!(mount.deferral_path(), &DeferralPath::new(vec![1]));
  }

  #[test]
  fn unmount_is_idempotent_test() {
    let node = Element::text_static("a").into();
    let mut mount = Runtime::new().mount(node, MemoryTree::new()).unwrap();
    assert!(mount.is_mounted());
    mount.unmount().unwrap();
    mount.unmount().unwrap();
    assert!(!mount.is_mounted());
    assert_eq!(mount.num_deferred(), 0);
    assert!(mount.with_interpreter(|tree| tree.is_empty()));
  }

  #[test]
  fn fire_callback_test() {
    let clicks = Rc::new(std::cell::Cell::new(0));
    let node = {
      let clicks = clicks.clone();
      Element::new(
        "button",
        vec![Poll::pure(Attribute::callback("click", move |payload| {
          if let Some(count) = payload.downcast_ref::<u32>() {
            clicks.set(clicks.get() + count);
          }
        }))],
        vec![],
      )
      .into()
    };
    let mount = Runtime::new().mount(node, MemoryTree::new()).unwrap();
    let button = mount
      .with_interpreter(|tree| tree.find_tag(Id::ROOT, "button"))
      .unwrap();
    assert!(mount.fire(button, "click", &3u32));
    assert!(!mount.fire(button, "hover", &1u32));
    assert_eq!(clicks.get(), 3);
  }
}
