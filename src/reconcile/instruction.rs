use crate::deferred::DeferralPath;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The identity of a unit held by an interpreter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u64);

impl Id {
  /// Reserved for the mount root, allocation starts after it
  pub const ROOT: Id = Id(0);
}

impl fmt::Display for Id {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// The name of the actor allowed to detach a unit
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
  Global,
  Local(String),
}

impl Scope {
  /// The scope of a child actor identified by `id`
  pub fn child(&self, id: Id) -> Scope {
    match self {
      Scope::Global => Scope::Local(id.0.to_string()),
      Scope::Local(parent) => Scope::Local(format!("{}!{}", parent, id.0)),
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scope::Global => write!(f, "global"),
      Scope::Local(name) => write!(f, "{}", name),
    }
  }
}

/// A handler for an event raised by the interpreter's backend
///
/// The payload is whatever native event the backend produces.
#[derive(Clone)]
pub struct Callback {
  func: Rc<dyn Fn(&dyn Any)>,
}

impl Callback {
  pub fn new<F>(func: F) -> Self
  where
    F: Fn(&dyn Any) + 'static,
  {
    Callback {
      func: Rc::new(func),
    }
  }

  pub fn call(&self, payload: &dyn Any) {
    (self.func)(payload)
  }
}

impl fmt::Debug for Callback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Callback")
  }
}

#[derive(Clone, Debug)]
pub enum AttributeValue {
  Prop(String),
  Callback(Callback),
  Unset,
}

/// One update to a keyed property of an element
#[derive(Clone, Debug)]
pub struct Attribute {
  pub key: String,
  pub value: AttributeValue,
}

impl Attribute {
  pub fn prop(key: &str, value: &str) -> Self {
    Attribute {
      key: key.to_owned(),
      value: AttributeValue::Prop(value.to_owned()),
    }
  }

  pub fn callback<F>(key: &str, func: F) -> Self
  where
    F: Fn(&dyn Any) + 'static,
  {
    Attribute {
      key: key.to_owned(),
      value: AttributeValue::Callback(Callback::new(func)),
    }
  }

  pub fn unset(key: &str) -> Self {
    Attribute {
      key: key.to_owned(),
      value: AttributeValue::Unset,
    }
  }

  pub(crate) fn into_instruction(self, id: Id) -> Instruction {
    let key = self.key;
    match self.value {
      AttributeValue::Prop(value) => Instruction::SetProperty { id, key, value },
      AttributeValue::Callback(value) => Instruction::SetCallback { id, key, value },
      AttributeValue::Unset => Instruction::UnsetProperty { id, key },
    }
  }
}

/// Where a new unit goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitPlacement {
  pub id: Id,
  pub parent: Option<Id>,
  pub scope: Scope,
  pub pos: Option<usize>,
  pub dyn_family: Option<Id>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateElement {
  pub unit: UnitPlacement,
  pub tag: String,
  pub namespace: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachToParent {
  pub id: Id,
  pub parent: Id,
  pub pos: Option<usize>,
  pub dyn_family: Option<Id>,
  pub immediate: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disconnect {
  pub id: Id,
  pub parent: Id,
  pub scope: Scope,
}

/// A single mutation of the interpreter's tree, or an operation on the
/// deferred queue
#[derive(Clone, Debug)]
pub enum Instruction {
  CreateElement(CreateElement),
  CreateText(UnitPlacement),
  CreateDynamicBeacon(UnitPlacement),
  CreateRoot { id: Id },
  AttachToParent(AttachToParent),
  SetProperty { id: Id, key: String, value: String },
  SetCallback { id: Id, key: String, value: Callback },
  UnsetProperty { id: Id, key: String },
  SetText { id: Id, value: String },
  Reposition { id: Id, pos: usize },
  Disconnect(Disconnect),
  DeleteFromCache { id: Id },
  /// Holds `instruction` until `path` is forced
  Defer {
    path: DeferralPath,
    instruction: Box<Instruction>,
  },
  /// Runs everything deferred at `path` or under it
  Force { path: DeferralPath },
}

impl Instruction {
  pub fn defer(path: DeferralPath, instruction: Instruction) -> Self {
    Instruction::Defer {
      path,
      instruction: Box::new(instruction),
    }
  }

  /// A short name for the instruction, for logging
  pub fn name(&self) -> &'static str {
    match self {
      Instruction::CreateElement(_) => "create-element",
      Instruction::CreateText(_) => "create-text",
      Instruction::CreateDynamicBeacon(_) => "create-dynamic-beacon",
      Instruction::CreateRoot { .. } => "create-root",
      Instruction::AttachToParent(_) => "attach-to-parent",
      Instruction::SetProperty { .. } => "set-property",
      Instruction::SetCallback { .. } => "set-callback",
      Instruction::UnsetProperty { .. } => "unset-property",
      Instruction::SetText { .. } => "set-text",
      Instruction::Reposition { .. } => "reposition",
      Instruction::Disconnect(_) => "disconnect",
      Instruction::DeleteFromCache { .. } => "delete-from-cache",
      Instruction::Defer { .. } => "defer",
      Instruction::Force { .. } => "force",
    }
  }
}
