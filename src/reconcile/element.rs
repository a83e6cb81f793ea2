use super::instruction::{
  AttachToParent, Attribute, CreateElement, Id, Instruction, UnitPlacement,
};
use super::{flatten, Ids, Node, Placement};
use crate::event::dispatcher::Invoker;
use crate::event::observable::Event;
use crate::poll::Poll;

use std::rc::Rc;

pub enum ElementKind {
  Tag {
    namespace: Option<String>,
    tag: String,
    attributes: Poll<Attribute>,
    children: Node,
  },
  Text(Poll<String>),
  /// Brackets its content between a start and an end marker so that the
  /// content can be ordered and detached as one range
  Beacon(Node),
}

/// A single unit of the description tree
///
/// # Example
/// ```
/// use cadence::poll::Poll;
/// use cadence::reconcile::element::Element;
/// use cadence::reconcile::instruction::Attribute;
///
/// let item = Element::new(
///   "li",
///   vec![Poll::pure(Attribute::prop("class", "item"))],
///   vec![Element::text_static("hello").into()],
/// );
/// assert_eq!(item.tag(), Some("li"));
/// ```
#[derive(Clone)]
pub struct Element {
  kind: Rc<ElementKind>,
  pos: Option<usize>,
}

impl Element {
  pub fn new(tag: &str, attributes: Vec<Poll<Attribute>>, children: Vec<Node>) -> Self {
    Element::build(None, tag, attributes, children)
  }

  pub fn namespaced(
    namespace: &str,
    tag: &str,
    attributes: Vec<Poll<Attribute>>,
    children: Vec<Node>,
  ) -> Self {
    Element::build(Some(namespace.to_owned()), tag, attributes, children)
  }

  fn build(
    namespace: Option<String>,
    tag: &str,
    attributes: Vec<Poll<Attribute>>,
    children: Vec<Node>,
  ) -> Self {
    // Fixed children remember their index among their siblings.
    let children = children
      .into_iter()
      .enumerate()
      .map(|(idx, child)| match child {
        Node::Element(element) => Node::Element(element.positioned(idx)),
        other => other,
      })
      .collect();
    Element {
      kind: Rc::new(ElementKind::Tag {
        namespace,
        tag: tag.to_owned(),
        attributes: Poll::merge(attributes),
        children: Node::Fixed(children),
      }),
      pos: None,
    }
  }

  pub fn text(content: Poll<String>) -> Self {
    Element {
      kind: Rc::new(ElementKind::Text(content)),
      pos: None,
    }
  }

  pub fn text_static(content: &str) -> Self {
    Element::text(Poll::pure(content.to_owned()))
  }

  pub fn beacon(node: Node) -> Self {
    Element {
      kind: Rc::new(ElementKind::Beacon(node)),
      pos: None,
    }
  }

  /// Fixes the position reported for this element when it is placed
  pub fn positioned(self, pos: usize) -> Self {
    Element {
      kind: self.kind,
      pos: Some(pos),
    }
  }

  pub fn kind(&self) -> &ElementKind {
    &self.kind
  }

  pub fn pos(&self) -> Option<usize> {
    self.pos
  }

  pub fn tag(&self) -> Option<&str> {
    match self.kind.as_ref() {
      ElementKind::Tag { tag, .. } => Some(tag),
      _ => None,
    }
  }

  pub(super) fn flatten(&self, placement: &Placement, ids: &Ids) -> Event<Instruction> {
    let mut placement = placement.clone();
    if let Some(pos) = self.pos {
      placement.pos = Some(pos);
    }
    let (kind, ids) = (self.kind.clone(), ids.clone());
    Event::new(move |invoker: Invoker<Instruction>| match kind.as_ref() {
      ElementKind::Tag {
        namespace,
        tag,
        attributes,
        children,
      } => {
        let me = ids.allocate_id();
        placement.raise(me);
        invoker.invoke(Instruction::CreateElement(CreateElement {
          unit: placement.unit(me),
          tag: tag.clone(),
          namespace: namespace.clone(),
        }));
        attach(&placement, me, &invoker);
        delete_later(&placement, me, &invoker);
        let properties = {
          let invoker = invoker.clone();
          attributes
            .sample_now()
            .subscribe(move |attribute: Attribute| invoker.invoke(attribute.into_instruction(me)))
        };
        let children = flatten(children, &placement.nested(me), &ids).subscribe_invoker(invoker);
        properties.and(children)
      }
      ElementKind::Text(content) => {
        let me = ids.allocate_id();
        placement.raise(me);
        invoker.invoke(Instruction::CreateText(placement.unit(me)));
        attach(&placement, me, &invoker);
        delete_later(&placement, me, &invoker);
        content
          .sample_now()
          .subscribe(move |value| invoker.invoke(Instruction::SetText { id: me, value }))
      }
      ElementKind::Beacon(node) => {
        let me = ids.allocate_id();
        placement.raise(me);
        let parent = match placement.parent {
          Some(parent) => parent,
          None => stand_in(&placement, &ids, &invoker),
        };
        invoker.invoke(Instruction::CreateDynamicBeacon(UnitPlacement {
          parent: Some(parent),
          ..placement.unit(me)
        }));
        invoker.invoke(Instruction::AttachToParent(AttachToParent {
          id: me,
          parent,
          pos: placement.pos,
          dyn_family: placement.dyn_family,
          immediate: placement.immediate,
        }));
        delete_later(&placement, me, &invoker);
        flatten(node, &placement.family(parent, me), &ids).subscribe_invoker(invoker)
      }
    })
  }
}

impl From<Element> for Node {
  fn from(element: Element) -> Self {
    Node::Element(element)
  }
}

fn attach(placement: &Placement, id: Id, invoker: &Invoker<Instruction>) {
  if let Some(parent) = placement.parent {
    invoker.invoke(Instruction::AttachToParent(AttachToParent {
      id,
      parent,
      pos: placement.pos,
      dyn_family: placement.dyn_family,
      immediate: placement.immediate,
    }));
  }
}

fn delete_later(placement: &Placement, id: Id, invoker: &Invoker<Instruction>) {
  invoker.invoke(Instruction::defer(
    placement.deferral_path.clone(),
    Instruction::DeleteFromCache { id },
  ));
}

// A beacon needs a real parent to hold its markers.
fn stand_in(placement: &Placement, ids: &Ids, invoker: &Invoker<Instruction>) -> Id {
  let id = ids.allocate_id();
  invoker.invoke(Instruction::CreateElement(CreateElement {
    unit: UnitPlacement {
      id,
      parent: None,
      scope: placement.scope.clone(),
      pos: None,
      dyn_family: None,
    },
    tag: "div".to_owned(),
    namespace: None,
  }));
  delete_later(placement, id, invoker);
  id
}
