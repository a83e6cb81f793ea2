//! The reconciler turns a description tree into a stream of instructions.
//!
//! [flatten] subscribes to every reactive part of a [Node] and translates
//! what happens into [Instruction]s: units are created and attached when the
//! description is subscribed to, properties and text follow their polls, and
//! dynamic lists add, move and remove slots as their control channels
//! dictate. Teardown work is deferred on the path of the subtree that owns it
//! and runs when that subtree is forced.
//!
//! * `element` holds the element kinds and their translation.
//! * `instruction` holds the instruction set and its vocabulary types.
//!
pub mod element;
pub mod instruction;

use crate::deferred::DeferralPath;
use crate::event::dispatcher::Invoker;
use crate::event::observable::Event;
use crate::event::subscription::Subscription;
use crate::mailbox::Mailbox;
use element::Element;
use instruction::{Disconnect, Id, Instruction, Scope, UnitPlacement};
use log::{debug, trace};

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Hands out fresh unit ids
pub trait IdSource {
  fn allocate_id(&self) -> Id;
}

pub type Ids = Rc<dyn IdSource>;

/// A monotonic id counter starting right after [Id::ROOT]
#[derive(Debug)]
pub struct IdCounter {
  next: Cell<u64>,
}

impl Default for IdCounter {
  fn default() -> Self {
    IdCounter {
      next: Cell::new(Id::ROOT.0 + 1),
    }
  }
}

impl IdCounter {
  pub fn new() -> Self {
    Self::default()
  }
}

impl IdSource for IdCounter {
  fn allocate_id(&self) -> Id {
    let id = self.next.get();
    self.next.set(id + 1);
    Id(id)
  }
}

/// Commands sent to one slot of a dynamic list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
  /// Moves the slot to a logical index among its siblings
  Logic(usize),
  /// Detaches the slot and runs its deferred teardown
  Remove,
}

/// One entry of a dynamic list: what to show, and the channel that moves or
/// removes it
#[derive(Clone)]
pub struct Slot {
  pub control: Event<Control>,
  pub node: Node,
}

impl Slot {
  pub fn new(node: Node, control: Event<Control>) -> Self {
    Slot { control, node }
  }
}

/// A description tree
#[derive(Clone)]
pub enum Node {
  Element(Element),
  /// Children placed in order, once
  Fixed(Vec<Node>),
  /// Children added over time, each one able to move and leave
  ///
  /// Outside of a beacon the list is given one of its own when flattened.
  Dynamic(Event<Slot>),
}

impl Node {
  pub fn fixed(children: Vec<Node>) -> Self {
    Node::Fixed(children)
  }

  /// A dynamic list bracketed by its own beacon, the usual way to embed one
  pub fn dynamic(slots: Event<Slot>) -> Self {
    Node::Element(Element::beacon(Node::Dynamic(slots)))
  }
}

/// The context a node is flattened in
#[derive(Clone)]
pub struct Placement {
  pub parent: Option<Id>,
  pub scope: Scope,
  pub deferral_path: DeferralPath,
  pub pos: Option<usize>,
  pub dyn_family: Option<Id>,
  /// Attach by appending instead of searching for a place
  pub immediate: bool,
  raise_id: Rc<dyn Fn(Id)>,
}

impl Placement {
  pub fn root(parent: Id, scope: Scope, deferral_path: DeferralPath) -> Self {
    Placement {
      parent: Some(parent),
      scope,
      deferral_path,
      pos: None,
      dyn_family: None,
      immediate: true,
      raise_id: Rc::new(|_| {}),
    }
  }

  /// Reports every top-level unit created under this placement to `raise`
  pub fn with_raise<F>(self, raise: F) -> Self
  where
    F: Fn(Id) + 'static,
  {
    Placement {
      raise_id: Rc::new(raise),
      ..self
    }
  }

  pub fn raise(&self, id: Id) {
    (self.raise_id)(id)
  }

  pub fn unit(&self, id: Id) -> UnitPlacement {
    UnitPlacement {
      id,
      parent: self.parent,
      scope: self.scope.clone(),
      pos: self.pos,
      dyn_family: self.dyn_family,
    }
  }

  // The children of an element are appended to it in order.
  fn nested(&self, parent: Id) -> Placement {
    Placement {
      parent: Some(parent),
      scope: self.scope.clone(),
      deferral_path: self.deferral_path.clone(),
      pos: None,
      dyn_family: None,
      immediate: true,
      raise_id: Rc::new(|_| {}),
    }
  }

  // The content of a beacon is ordered inside the beacon's range.
  fn family(&self, parent: Id, beacon: Id) -> Placement {
    Placement {
      parent: Some(parent),
      scope: self.scope.clone(),
      deferral_path: self.deferral_path.clone(),
      pos: None,
      dyn_family: Some(beacon),
      immediate: false,
      raise_id: Rc::new(|_| {}),
    }
  }
}

/// Translates a description tree into instructions
///
/// Nothing is allocated until the returned event is subscribed to, and each
/// subscription builds an independent copy of the tree. Unsubscribing stops
/// all reactive updates but does not emit teardown instructions: those wait
/// on the deferral path.
pub fn flatten(node: &Node, placement: &Placement, ids: &Ids) -> Event<Instruction> {
  match node {
    Node::Element(element) => element.flatten(placement, ids),
    Node::Fixed(children) => Event::merge(
      children
        .iter()
        .map(|child| flatten(child, placement, ids))
        .collect(),
    ),
    // A dynamic list needs a family to order its slots in.
    Node::Dynamic(_) if placement.dyn_family.is_none() => {
      Element::beacon(node.clone()).flatten(placement, ids)
    }
    Node::Dynamic(slots) => flatten_dynamic(slots, placement, ids),
  }
}

fn flatten_dynamic(slots: &Event<Slot>, placement: &Placement, ids: &Ids) -> Event<Instruction> {
  let (slots, placement, ids) = (slots.clone(), placement.clone(), ids.clone());
  Event::new(move |invoker: Invoker<Instruction>| {
    let fire_id = ids.allocate_id();
    invoker.invoke(Instruction::defer(
      placement.deferral_path.clone(),
      Instruction::Force {
        path: placement.deferral_path.child(fire_id.0),
      },
    ));
    let family = Rc::new(SlotFamily {
      fire_id,
      placement: placement.clone(),
      ids: ids.clone(),
      invoker,
      mailbox: Mailbox::new(),
      live: RefCell::new(BTreeMap::new()),
    });
    let mounting = {
      let family = family.clone();
      slots.subscribe(move |slot| family.mount(slot))
    };
    Subscription::new(move || {
      drop(mounting);
      family.release();
    })
  })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
  Listening,
  Closed,
}

struct SlotState {
  id: Id,
  scope: Scope,
  deferral_path: DeferralPath,
  raised: RefCell<Vec<Id>>,
  stage: Cell<Stage>,
}

// The shared bookkeeping of one subscription to a dynamic list.
struct SlotFamily {
  fire_id: Id,
  placement: Placement,
  ids: Ids,
  invoker: Invoker<Instruction>,
  mailbox: Mailbox<Id, Control>,
  live: RefCell<BTreeMap<Id, Subscription>>,
}

impl SlotFamily {
  fn mount(self: &Rc<Self>, slot: Slot) {
    let id = self.ids.allocate_id();
    let state = Rc::new(SlotState {
      id,
      scope: self.placement.scope.child(self.ids.allocate_id()),
      deferral_path: self.placement.deferral_path.extend(&[self.fire_id.0, id.0]),
      raised: RefCell::new(Vec::new()),
      stage: Cell::new(Stage::Listening),
    });
    debug!("mounting slot {} at {}", id, state.deferral_path);
    let commands = {
      let (family, state) = (Rc::downgrade(self), state.clone());
      self.mailbox.event(id).subscribe(move |control| {
        if let Some(family) = family.upgrade() {
          family.command(&state, control);
        }
      })
    };
    let placement = Placement {
      scope: state.scope.clone(),
      deferral_path: state.deferral_path.clone(),
      ..self.placement.clone()
    }
    .with_raise({
      let state = state.clone();
      move |raised| state.raised.borrow_mut().push(raised)
    });
    let elements =
      flatten(&slot.node, &placement, &self.ids).subscribe_invoker(self.invoker.clone());
    let forwarding = {
      let mailbox = self.mailbox.clone();
      slot.control.subscribe(move |control| mailbox.push(&id, control))
    };
    let subscription = Subscription::merge(vec![forwarding, commands, elements]);
    if state.stage.get() == Stage::Closed {
      drop(subscription);
    } else {
      self.live.borrow_mut().insert(id, subscription);
    }
  }

  fn command(&self, state: &SlotState, control: Control) {
    if state.stage.get() == Stage::Closed {
      trace!("slot {} is closed, ignoring {:?}", state.id, control);
      return;
    }
    let raised = state.raised.borrow().clone();
    match control {
      Control::Logic(pos) => {
        for id in raised.into_iter() {
          self.invoker.invoke(Instruction::Reposition { id, pos });
        }
      }
      Control::Remove => {
        state.stage.set(Stage::Closed);
        debug!("removing slot {} holding {} units", state.id, raised.len());
        if let Some(parent) = self.placement.parent {
          for id in raised.into_iter() {
            self.invoker.invoke(Instruction::Disconnect(Disconnect {
              id,
              parent,
              scope: state.scope.clone(),
            }));
          }
        }
        self.invoker.invoke(Instruction::Force {
          path: state.deferral_path.clone(),
        });
        let released = self.live.borrow_mut().remove(&state.id);
        drop(released);
      }
    }
  }

  fn release(&self) {
    let released = std::mem::take(&mut *self.live.borrow_mut());
    drop(released);
  }
}
