use super::{InterpretError, Interpreter};
use crate::reconcile::instruction::{
  AttachToParent, Callback, CreateElement, Disconnect, Id, Scope, UnitPlacement,
};
use crate::reconcile::{IdCounter, IdSource};
use log::debug;

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// One entry in a unit's list of children
///
/// Beacons own no children of their own. They bracket the content of their
/// family inside their host's list with a start and an end marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
  Main(Id),
  Start(Id),
  End(Id),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Repr {
  Root,
  Element {
    tag: String,
    namespace: Option<String>,
  },
  Text,
  Beacon,
}

struct Unit {
  repr: Repr,
  parent: Option<Id>,
  scope: Scope,
  pos: Option<usize>,
  dyn_family: Option<Id>,
  containing_scope: Option<Scope>,
  attributes: BTreeMap<String, String>,
  callbacks: BTreeMap<String, Callback>,
  text: String,
  children: Vec<Child>,
  host: Option<Id>,
}

impl Unit {
  fn new(repr: Repr, placement: UnitPlacement) -> Self {
    Unit {
      repr,
      parent: placement.parent,
      scope: placement.scope,
      pos: placement.pos,
      dyn_family: placement.dyn_family,
      containing_scope: None,
      attributes: BTreeMap::new(),
      callbacks: BTreeMap::new(),
      text: String::new(),
      children: Vec::new(),
      host: None,
    }
  }

  fn nodes(&self, id: Id) -> Vec<Child> {
    match self.repr {
      Repr::Beacon => vec![Child::Start(id), Child::End(id)],
      _ => vec![Child::Main(id)],
    }
  }
}

/// An interpreter that keeps the tree in memory
///
/// Used to run a mount without a real backend and to inspect the result.
///
/// # Example
/// ```
/// use cadence::interpret::tree::MemoryTree;
/// use cadence::reconcile::element::Element;
/// use cadence::runtime::RuntimeBuilder;
///
/// let runtime = RuntimeBuilder::new().build();
/// let node = Element::new("p", vec![], vec![Element::text_static("hi").into()]).into();
/// let mount = runtime.mount(node, MemoryTree::new()).unwrap();
/// assert_eq!(mount.with_interpreter(|tree| tree.render_root()), "<p>hi</p>");
/// ```
#[derive(Default)]
pub struct MemoryTree {
  units: HashMap<Id, Unit>,
  ids: IdCounter,
}

impl MemoryTree {
  pub fn new() -> Self {
    Self::default()
  }

  fn unit(&self, id: Id) -> Result<&Unit, InterpretError> {
    self.units.get(&id).ok_or(InterpretError::UnknownUnit(id))
  }

  fn unit_mut(&mut self, id: Id) -> Result<&mut Unit, InterpretError> {
    self.units.get_mut(&id).ok_or(InterpretError::UnknownUnit(id))
  }

  fn create(&mut self, repr: Repr, placement: UnitPlacement) {
    let id = placement.id;
    self.units.insert(id, Unit::new(repr, placement));
  }

  // The span of `id`'s nodes in its host's children.
  fn range_of(&self, host: Id, id: Id) -> Option<Range<usize>> {
    let children = &self.units.get(&host)?.children;
    let start = children
      .iter()
      .position(|child| *child == Child::Main(id) || *child == Child::Start(id))?;
    match children[start] {
      Child::Start(_) => {
        let end = children[start..].iter().position(|child| *child == Child::End(id))?;
        Some(start..start + end + 1)
      }
      _ => Some(start..start + 1),
    }
  }

  // Where a unit of `family` asking for `pos` goes among `host`'s children.
  fn placement_in_family(&self, host: &Unit, family: Id, pos: Option<usize>) -> Option<usize> {
    let children = &host.children;
    let start = children.iter().position(|child| *child == Child::Start(family))?;
    let mut counted = 0;
    let mut nested: Option<Id> = None;
    for (idx, child) in children.iter().enumerate().skip(start + 1) {
      if *child == Child::End(family) {
        return Some(idx);
      }
      if let Some(inner) = nested {
        if *child == Child::End(inner) {
          nested = None;
          counted += 1;
        }
        continue;
      }
      let sibling = match *child {
        Child::Main(sibling) | Child::Start(sibling) => sibling,
        Child::End(_) => continue,
      };
      if let Some(pos) = pos {
        if let Some(unit) = self.units.get(&sibling) {
          if unit.dyn_family == Some(family) && unit.pos.map_or(false, |other| pos <= other) {
            return Some(idx);
          }
        }
        if counted == pos {
          return Some(idx);
        }
      }
      match *child {
        Child::Start(inner) => nested = Some(inner),
        _ => counted += 1,
      }
    }
    None
  }

  fn set_host(&mut self, nodes: &[Child], host: Option<Id>) {
    for node in nodes.iter() {
      if let Child::Main(id) | Child::Start(id) = *node {
        if let Some(unit) = self.units.get_mut(&id) {
          unit.host = host;
        }
      }
    }
  }

  pub fn contains(&self, id: Id) -> bool {
    self.units.contains_key(&id)
  }

  /// The number of units held
  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  pub fn children_of(&self, id: Id) -> Vec<Child> {
    self
      .units
      .get(&id)
      .map(|unit| unit.children.clone())
      .unwrap_or_default()
  }

  /// The elements and texts hosted by `id`, in order, without beacon markers
  pub fn nodes_of(&self, id: Id) -> Vec<Id> {
    self
      .children_of(id)
      .into_iter()
      .filter_map(|child| match child {
        Child::Main(id) => Some(id),
        _ => None,
      })
      .collect()
  }

  pub fn host_of(&self, id: Id) -> Option<Id> {
    self.units.get(&id).and_then(|unit| unit.host)
  }

  pub fn parent_of(&self, id: Id) -> Option<Id> {
    self.units.get(&id).and_then(|unit| unit.parent)
  }

  pub fn unit_pos(&self, id: Id) -> Option<usize> {
    self.units.get(&id).and_then(|unit| unit.pos)
  }

  pub fn tag(&self, id: Id) -> Option<&str> {
    match &self.units.get(&id)?.repr {
      Repr::Element { tag, .. } => Some(tag),
      _ => None,
    }
  }

  pub fn namespace(&self, id: Id) -> Option<&str> {
    match &self.units.get(&id)?.repr {
      Repr::Element { namespace, .. } => namespace.as_deref(),
      _ => None,
    }
  }

  pub fn text(&self, id: Id) -> Option<&str> {
    let unit = self.units.get(&id)?;
    match unit.repr {
      Repr::Text => Some(&unit.text),
      _ => None,
    }
  }

  pub fn attribute(&self, id: Id, key: &str) -> Option<&str> {
    self
      .units
      .get(&id)?
      .attributes
      .get(key)
      .map(|value| value.as_str())
  }

  pub fn callback(&self, id: Id, key: &str) -> Option<Callback> {
    self.units.get(&id)?.callbacks.get(key).cloned()
  }

  /// Finds the first element with `tag` under `id`, depth first
  pub fn find_tag(&self, id: Id, tag: &str) -> Option<Id> {
    for child in self.nodes_of(id).into_iter() {
      if self.tag(child) == Some(tag) {
        return Some(child);
      }
      if let Some(found) = self.find_tag(child, tag) {
        return Some(found);
      }
    }
    None
  }

  /// The concatenated text under `id`
  pub fn text_content(&self, id: Id) -> String {
    let mut out = String::new();
    self.collect_text(id, &mut out);
    out
  }

  fn collect_text(&self, id: Id, out: &mut String) {
    if let Some(unit) = self.units.get(&id) {
      if unit.repr == Repr::Text {
        out.push_str(&unit.text);
      }
      for child in self.nodes_of(id).into_iter() {
        self.collect_text(child, out);
      }
    }
  }

  /// Renders the subtree under `id` as markup
  pub fn render(&self, id: Id) -> String {
    let mut out = String::new();
    self.render_into(id, &mut out);
    out
  }

  pub fn render_root(&self) -> String {
    self.render(Id::ROOT)
  }

  fn render_into(&self, id: Id, out: &mut String) {
    let unit = match self.units.get(&id) {
      Some(unit) => unit,
      None => return,
    };
    match &unit.repr {
      Repr::Root => self.render_children(id, out),
      Repr::Text => out.push_str(&unit.text),
      Repr::Beacon => {}
      Repr::Element { tag, .. } => {
        out.push('<');
        out.push_str(tag);
        for (key, value) in unit.attributes.iter() {
          out.push_str(&format!(" {}=\"{}\"", key, value));
        }
        out.push('>');
        self.render_children(id, out);
        out.push_str(&format!("</{}>", tag));
      }
    }
  }

  fn render_children(&self, id: Id, out: &mut String) {
    for child in self.nodes_of(id).into_iter() {
      self.render_into(child, out);
    }
  }
}

impl Interpreter for MemoryTree {
  fn allocate_id(&mut self) -> Id {
    self.ids.allocate_id()
  }

  fn create_element(&mut self, element: CreateElement) -> Result<(), InterpretError> {
    let repr = Repr::Element {
      tag: element.tag,
      namespace: element.namespace,
    };
    self.create(repr, element.unit);
    Ok(())
  }

  fn create_text(&mut self, text: UnitPlacement) -> Result<(), InterpretError> {
    self.create(Repr::Text, text);
    Ok(())
  }

  fn create_dynamic_beacon(&mut self, beacon: UnitPlacement) -> Result<(), InterpretError> {
    self.create(Repr::Beacon, beacon);
    Ok(())
  }

  fn create_root(&mut self, id: Id) -> Result<(), InterpretError> {
    let placement = UnitPlacement {
      id,
      parent: None,
      scope: Scope::Global,
      pos: None,
      dyn_family: None,
    };
    self.create(Repr::Root, placement);
    Ok(())
  }

  fn attach_to_parent(&mut self, attach: AttachToParent) -> Result<(), InterpretError> {
    let unit = self.unit(attach.id)?;
    if unit.host.is_some() {
      return Ok(());
    }
    let nodes = unit.nodes(attach.id);
    let host = match self.units.get(&attach.parent) {
      Some(host) => host,
      None => panic!("attaching {} to unknown parent {}", attach.id, attach.parent),
    };
    let at = match (attach.immediate, attach.dyn_family) {
      (false, Some(family)) => self.placement_in_family(host, family, attach.pos),
      _ => None,
    }
    .unwrap_or(host.children.len());
    if let Some(host) = self.units.get_mut(&attach.parent) {
      host.children.splice(at..at, nodes.iter().copied());
    }
    self.set_host(&nodes, Some(attach.parent));
    Ok(())
  }

  fn set_property(&mut self, id: Id, key: &str, value: &str) -> Result<(), InterpretError> {
    self
      .unit_mut(id)?
      .attributes
      .insert(key.to_owned(), value.to_owned());
    Ok(())
  }

  fn set_callback(&mut self, id: Id, key: &str, callback: Callback) -> Result<(), InterpretError> {
    self.unit_mut(id)?.callbacks.insert(key.to_owned(), callback);
    Ok(())
  }

  fn unset_property(&mut self, id: Id, key: &str) -> Result<(), InterpretError> {
    let unit = self.unit_mut(id)?;
    unit.attributes.remove(key);
    unit.callbacks.remove(key);
    Ok(())
  }

  fn set_text(&mut self, id: Id, text: &str) -> Result<(), InterpretError> {
    let unit = self.unit_mut(id)?;
    unit.text.clear();
    unit.text.push_str(text);
    Ok(())
  }

  fn reposition(&mut self, id: Id, pos: usize) -> Result<(), InterpretError> {
    let (family, host) = match self.units.get_mut(&id) {
      Some(unit) => {
        unit.containing_scope = Some(unit.scope.clone());
        match (unit.dyn_family, unit.host) {
          (Some(family), Some(host)) => (family, host),
          (None, _) => panic!("repositioning {} which has no dynamic family", id),
          (_, None) => panic!("repositioning {} which is not attached", id),
        }
      }
      None => panic!("repositioning unknown unit {}", id),
    };
    let children = self.children_of(host);
    let mut counted = 0;
    let mut anchor = None;
    let mut renumbered = Vec::new();
    let mut reached_end = false;
    for (idx, child) in children.iter().enumerate() {
      let sibling = match *child {
        Child::End(beacon) if beacon == family => {
          anchor = Some(idx);
          reached_end = true;
          break;
        }
        Child::End(_) => continue,
        Child::Main(sibling) | Child::Start(sibling) => sibling,
      };
      match self.units.get(&sibling) {
        Some(unit) if unit.dyn_family == Some(family) => {}
        _ => continue,
      }
      if counted == pos {
        anchor = Some(idx);
        break;
      }
      renumbered.push((sibling, counted));
      counted += 1;
    }
    for (sibling, pos) in renumbered.into_iter() {
      if let Some(unit) = self.units.get_mut(&sibling) {
        unit.pos = Some(pos);
      }
    }
    if reached_end {
      if let Some(unit) = self.units.get_mut(&id) {
        unit.pos = Some(counted);
      }
    }
    let range = match self.range_of(host, id) {
      Some(range) => range,
      None => return Err(InterpretError::UnknownUnit(id)),
    };
    let at = match anchor {
      Some(anchor) if range.contains(&anchor) => return Ok(()),
      Some(anchor) if anchor > range.start => anchor - range.len(),
      Some(anchor) => anchor,
      None => children.len() - range.len(),
    };
    if let Some(host) = self.units.get_mut(&host) {
      let moved: Vec<Child> = host.children.drain(range).collect();
      host.children.splice(at..at, moved);
    }
    Ok(())
  }

  fn disconnect(&mut self, disconnect: Disconnect) -> Result<(), InterpretError> {
    let unit = self.unit(disconnect.id)?;
    if let Some(containing) = &unit.containing_scope {
      if *containing != disconnect.scope {
        debug!(
          "rejecting disconnect of {} from scope {}, it belongs to {}",
          disconnect.id, disconnect.scope, containing
        );
        return Ok(());
      }
    }
    let host = match unit.host {
      Some(host) => host,
      None => return Ok(()),
    };
    let range = match self.range_of(host, disconnect.id) {
      Some(range) => range,
      None => return Ok(()),
    };
    let removed: Vec<Child> = match self.units.get_mut(&host) {
      Some(host) => host.children.drain(range).collect(),
      None => return Ok(()),
    };
    self.set_host(&removed, None);
    Ok(())
  }

  fn delete_from_cache(&mut self, id: Id) -> Result<(), InterpretError> {
    self.units.remove(&id);
    Ok(())
  }
}
