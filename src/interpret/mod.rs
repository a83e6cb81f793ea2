//! The boundary between the reconciler and whatever owns the real tree.
//!
//! An [Interpreter] applies mutations to a backend. The [Executor] is its only
//! caller: it owns the deferred queue, unwraps `Defer` and `Force`
//! instructions and records the first backend fault raised while the
//! reconciler was pushing instructions from inside event callbacks.
//!
//! * `tree` holds [MemoryTree](tree::MemoryTree), an in-memory interpreter.
//!
pub mod tree;

use crate::deferred::DeferredQueue;
use crate::event::dispatcher::Invoker;
use crate::reconcile::instruction::{
  AttachToParent, Callback, CreateElement, Disconnect, Id, Instruction, UnitPlacement,
};
use crate::reconcile::IdSource;
use log::{error, trace, warn};
use thiserror::Error;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
  #[error("unit {0} is not known to the interpreter")]
  UnknownUnit(Id),
  #[error("backend failure: {0}")]
  Backend(String),
}

pub trait Interpreter {
  fn allocate_id(&mut self) -> Id;
  fn create_element(&mut self, element: CreateElement) -> Result<(), InterpretError>;
  fn create_text(&mut self, text: UnitPlacement) -> Result<(), InterpretError>;
  fn create_dynamic_beacon(&mut self, beacon: UnitPlacement) -> Result<(), InterpretError>;
  fn create_root(&mut self, id: Id) -> Result<(), InterpretError>;
  fn attach_to_parent(&mut self, attach: AttachToParent) -> Result<(), InterpretError>;
  fn set_property(&mut self, id: Id, key: &str, value: &str) -> Result<(), InterpretError>;
  fn set_callback(&mut self, id: Id, key: &str, callback: Callback) -> Result<(), InterpretError>;
  fn unset_property(&mut self, id: Id, key: &str) -> Result<(), InterpretError>;
  fn set_text(&mut self, id: Id, text: &str) -> Result<(), InterpretError>;
  fn reposition(&mut self, id: Id, pos: usize) -> Result<(), InterpretError>;
  fn disconnect(&mut self, disconnect: Disconnect) -> Result<(), InterpretError>;
  fn delete_from_cache(&mut self, id: Id) -> Result<(), InterpretError>;
}

/// Runs instructions against an interpreter
pub struct Executor<I>
where
  I: Interpreter,
{
  interpreter: RefCell<I>,
  deferred: RefCell<DeferredQueue<Instruction>>,
  fault: RefCell<Option<InterpretError>>,
  halted: Cell<bool>,
  halt_on_fault: bool,
  trace_instructions: bool,
}

impl<I> Executor<I>
where
  I: Interpreter + 'static,
{
  pub fn new(interpreter: I, halt_on_fault: bool, trace_instructions: bool) -> Self {
    Executor {
      interpreter: RefCell::new(interpreter),
      deferred: RefCell::new(DeferredQueue::new()),
      fault: RefCell::new(None),
      halted: Cell::new(false),
      halt_on_fault,
      trace_instructions,
    }
  }

  /// Executes one instruction
  ///
  /// `Defer` stores its instruction, `Force` flushes the range and executes
  /// what it held, in key order. Execution stops at the first error.
  pub fn execute(&self, instruction: Instruction) -> Result<(), InterpretError> {
    if self.trace_instructions {
      trace!("{:?}", instruction);
    }
    match instruction {
      Instruction::Defer { path, instruction } => {
        self.deferred.borrow_mut().defer(path, *instruction);
        Ok(())
      }
      Instruction::Force { path } => {
        let forced = self.deferred.borrow_mut().force(&path);
        for instruction in forced.into_iter() {
          self.execute(instruction)?;
        }
        Ok(())
      }
      other => self.apply(other),
    }
  }

  fn apply(&self, instruction: Instruction) -> Result<(), InterpretError> {
    let mut interpreter = self.interpreter.borrow_mut();
    match instruction {
      Instruction::CreateElement(element) => interpreter.create_element(element),
      Instruction::CreateText(text) => interpreter.create_text(text),
      Instruction::CreateDynamicBeacon(beacon) => interpreter.create_dynamic_beacon(beacon),
      Instruction::CreateRoot { id } => interpreter.create_root(id),
      Instruction::AttachToParent(attach) => interpreter.attach_to_parent(attach),
      Instruction::SetProperty { id, key, value } => interpreter.set_property(id, &key, &value),
      Instruction::SetCallback { id, key, value } => interpreter.set_callback(id, &key, value),
      Instruction::UnsetProperty { id, key } => interpreter.unset_property(id, &key),
      Instruction::SetText { id, value } => interpreter.set_text(id, &value),
      Instruction::Reposition { id, pos } => interpreter.reposition(id, pos),
      Instruction::Disconnect(disconnect) => interpreter.disconnect(disconnect),
      Instruction::DeleteFromCache { id } => interpreter.delete_from_cache(id),
      Instruction::Defer { .. } | Instruction::Force { .. } => {
        unreachable!("deferred queue instructions are handled by execute")
      }
    }
  }

  /// Executes an instruction pushed from inside an event callback, where an
  /// error cannot be returned
  pub fn submit(&self, instruction: Instruction) {
    if self.halted.get() {
      warn!("executor halted, dropping {}", instruction.name());
      return;
    }
    if let Err(fault) = self.execute(instruction) {
      error!("interpreter fault: {}", fault);
      let mut slot = self.fault.borrow_mut();
      if slot.is_none() {
        *slot = Some(fault);
      }
      if self.halt_on_fault {
        self.halted.set(true);
      }
    }
  }

  pub fn invoker(self: &Rc<Self>) -> Invoker<Instruction> {
    let executor = self.clone();
    Invoker::new(move |instruction| executor.submit(instruction))
  }

  pub fn take_fault(&self) -> Option<InterpretError> {
    self.fault.borrow_mut().take()
  }

  pub fn is_halted(&self) -> bool {
    self.halted.get()
  }

  /// Executes everything still deferred, in key order
  ///
  /// A halted executor drops the deferred instructions instead.
  pub fn drain(&self) -> Result<(), InterpretError> {
    let drained = self.deferred.borrow_mut().drain();
    if self.halted.get() {
      warn!("executor halted, dropping {} deferred instructions", drained.len());
      return Ok(());
    }
    let mut first = None;
    for instruction in drained.into_iter() {
      if let Err(fault) = self.execute(instruction) {
        error!("interpreter fault while draining: {}", fault);
        first.get_or_insert(fault);
      }
    }
    match first {
      Some(fault) => Err(fault),
      None => Ok(()),
    }
  }

  /// The number of instructions waiting on a deferral path
  pub fn num_deferred(&self) -> usize {
    self.deferred.borrow().len()
  }

  pub fn with_interpreter<R, F>(&self, f: F) -> R
  where
    F: FnOnce(&I) -> R,
  {
    f(&self.interpreter.borrow())
  }

  /// Gives direct access to the backend, bypassing the deferred queue
  pub fn with_interpreter_mut<R, F>(&self, f: F) -> R
  where
    F: FnOnce(&mut I) -> R,
  {
    f(&mut self.interpreter.borrow_mut())
  }
}

impl<I> IdSource for Executor<I>
where
  I: Interpreter + 'static,
{
  fn allocate_id(&self) -> Id {
    self.interpreter.borrow_mut().allocate_id()
  }
}
