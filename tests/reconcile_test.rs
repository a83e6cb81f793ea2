use cadence::event::subject::{BasicSubject, StateSubject, Subject};
use cadence::interpret::tree::MemoryTree;
use cadence::interpret::{InterpretError, Interpreter};
use cadence::poll::Poll;
use cadence::reconcile::element::Element;
use cadence::reconcile::instruction::{
  Attribute, AttachToParent, Callback, CreateElement, Disconnect, Id, Scope, UnitPlacement,
};
use cadence::reconcile::{Control, Node, Slot};
use cadence::runtime::{Mount, RuntimeBuilder};
use cadence::utils::testing;

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

fn item(label: &str, pos: usize, control: &BasicSubject<Control>) -> Slot {
  let li = Element::new("li", vec![], vec![Element::text_static(label).into()]).positioned(pos);
  Slot::new(li.into(), control.event())
}

fn list(slots: &BasicSubject<Slot>) -> Node {
  Element::new("ul", vec![], vec![Node::dynamic(slots.event())]).into()
}

fn ul(mount: &Mount<MemoryTree>) -> Id {
  mount
    .with_interpreter(|tree| tree.find_tag(Id::ROOT, "ul"))
    .unwrap()
}

fn content(mount: &Mount<MemoryTree>) -> String {
  let ul = ul(mount);
  mount.with_interpreter(|tree| tree.text_content(ul))
}

#[test]
fn dynamic_list_reposition_test() {
  println!("START dynamic_list_reposition_test");
  testing::bounded_context(|| {
    init_logging();
    let slots = BasicSubject::new();
    let controls: Vec<BasicSubject<Control>> = (0..3).map(|_| BasicSubject::new()).collect();
    let mount = RuntimeBuilder::new()
      .trace_instructions(true)
      .build()
      .mount(list(&slots), MemoryTree::new())
      .unwrap();
    for (pos, label) in ["A", "B", "C"].iter().enumerate() {
      slots.push(item(label, pos, &controls[pos]));
    }
    assert_eq!(content(&mount), "ABC");
    controls[2].push(Control::Logic(0));
    assert_eq!(content(&mount), "CAB");
    let ul = ul(&mount);
    let positions: Vec<Option<usize>> = mount.with_interpreter(|tree| {
      tree
        .nodes_of(ul)
        .into_iter()
        .map(|id| tree.unit_pos(id))
        .collect()
    });
    assert_eq!(positions, [Some(2), Some(0), Some(1)]);
    assert!(mount.take_fault().is_none());
  });
  println!("END dynamic_list_reposition_test");
}

#[test]
fn list_without_beacon_repositions_test() {
  println!("START list_without_beacon_repositions_test");
  testing::bounded_context(|| {
    let slots = BasicSubject::new();
    let (a, b) = (BasicSubject::new(), BasicSubject::new());
    let node: Node = Element::new("ul", vec![], vec![Node::Dynamic(slots.event())]).into();
    let mount = RuntimeBuilder::new()
      .build()
      .mount(node, MemoryTree::new())
      .unwrap();
    slots.push(item("A", 0, &a));
    slots.push(item("B", 1, &b));
    assert_eq!(content(&mount), "AB");
    b.push(Control::Logic(0));
    assert_eq!(content(&mount), "BA");
    a.push(Control::Remove);
    assert_eq!(content(&mount), "B");
    assert!(mount.take_fault().is_none());
  });
  println!("END list_without_beacon_repositions_test");
}

#[test]
fn disconnect_only_from_own_scope_test() {
  println!("START disconnect_only_from_own_scope_test");
  testing::bounded_context(|| {
    let slots = BasicSubject::new();
    let (a, b) = (BasicSubject::new(), BasicSubject::new());
    let mount = RuntimeBuilder::new()
      .build()
      .mount(list(&slots), MemoryTree::new())
      .unwrap();
    slots.push(item("A", 0, &a));
    slots.push(item("B", 1, &b));
    b.push(Control::Logic(0));
    assert_eq!(content(&mount), "BA");
    let ul = ul(&mount);
    let moved = mount.with_interpreter(|tree| tree.nodes_of(ul)[0]);
    let foreign = mount.with_interpreter_mut(|tree| {
      tree.disconnect(Disconnect {
        id: moved,
        parent: ul,
        scope: Scope::Local("elsewhere".to_owned()),
      })
    });
    assert_eq!(foreign, Ok(()));
    assert_eq!(content(&mount), "BA");
    assert_eq!(mount.with_interpreter(|tree| tree.host_of(moved)), Some(ul));
    b.push(Control::Remove);
    assert_eq!(content(&mount), "A");
    assert!(!mount.with_interpreter(|tree| tree.contains(moved)));
    assert!(mount.take_fault().is_none());
  });
  println!("END disconnect_only_from_own_scope_test");
}

#[test]
fn slot_removal_flushes_teardown_test() {
  println!("START slot_removal_flushes_teardown_test");
  testing::bounded_context(|| {
    init_logging();
    let slots = BasicSubject::new();
    let (a, b) = (BasicSubject::new(), BasicSubject::new());
    let mount = RuntimeBuilder::new()
      .build()
      .mount(list(&slots), MemoryTree::new())
      .unwrap();
    slots.push(item("A", 0, &a));
    slots.push(item("B", 1, &b));
    let ul = ul(&mount);
    let removed = mount.with_interpreter(|tree| tree.nodes_of(ul)[1]);
    let units = mount.with_interpreter(|tree| tree.len());
    let deferred = mount.num_deferred();
    b.push(Control::Remove);
    assert_eq!(content(&mount), "A");
    // The item and its text are deleted.
    assert!(!mount.with_interpreter(|tree| tree.contains(removed)));
    assert_eq!(mount.with_interpreter(|tree| tree.len()), units - 2);
    assert_eq!(mount.num_deferred(), deferred - 2);
    assert_eq!(b.num_subscribers(), 0);
    b.push(Control::Logic(0));
    assert!(mount.take_fault().is_none());
  });
  println!("END slot_removal_flushes_teardown_test");
}

#[test]
fn removed_slot_is_replaced_test() {
  println!("START removed_slot_is_replaced_test");
  testing::bounded_context(|| {
    let slots = BasicSubject::new();
    let (a, b, c) = (BasicSubject::new(), BasicSubject::new(), BasicSubject::new());
    let mount = RuntimeBuilder::new()
      .build()
      .mount(list(&slots), MemoryTree::new())
      .unwrap();
    slots.push(item("A", 0, &a));
    slots.push(item("B", 1, &b));
    a.push(Control::Remove);
    slots.push(item("C", 0, &c));
    assert_eq!(content(&mount), "CB");
  });
  println!("END removed_slot_is_replaced_test");
}

#[test]
fn unmount_drains_everything_test() {
  println!("START unmount_drains_everything_test");
  testing::bounded_context(|| {
    let slots = BasicSubject::new();
    let controls: Vec<BasicSubject<Control>> = (0..2).map(|_| BasicSubject::new()).collect();
    let mut mount = RuntimeBuilder::new()
      .build()
      .mount(list(&slots), MemoryTree::new())
      .unwrap();
    slots.push(item("A", 0, &controls[0]));
    slots.push(item("B", 1, &controls[1]));
    assert!(mount.num_deferred() > 0);
    mount.unmount().unwrap();
    assert_eq!(mount.num_deferred(), 0);
    assert!(mount.with_interpreter(|tree| tree.is_empty()));
    assert_eq!(slots.num_subscribers(), 0);
    assert!(controls.iter().all(|control| control.num_subscribers() == 0));
  });
  println!("END unmount_drains_everything_test");
}

#[test]
fn callback_drives_text_test() {
  println!("START callback_drives_text_test");
  testing::bounded_context(|| {
    let count = StateSubject::new(0u32);
    let node: Node = {
      let count = count.clone();
      let label = Poll::from_event(&count.event()).map(|n: u32| format!("clicked {}", n));
      Element::new(
        "button",
        vec![
          Poll::pure(Attribute::prop("type", "button")),
          Poll::pure(Attribute::callback("click", move |_| count.push(count.state() + 1))),
        ],
        vec![Element::text(label).into()],
      )
      .into()
    };
    let mount = RuntimeBuilder::new()
      .build()
      .mount(node, MemoryTree::new())
      .unwrap();
    assert_eq!(
      mount.with_interpreter(|tree| tree.render_root()),
      "<button type=\"button\">clicked 0</button>"
    );
    let button = mount
      .with_interpreter(|tree| tree.find_tag(Id::ROOT, "button"))
      .unwrap();
    assert!(mount.fire(button, "click", &()));
    assert!(mount.fire(button, "click", &()));
    assert_eq!(mount.with_interpreter(|tree| tree.text_content(button)), "clicked 2");
  });
  println!("END callback_drives_text_test");
}

/// Refuses to show one particular text
struct Refusing {
  tree: MemoryTree,
  refused: &'static str,
}

impl Interpreter for Refusing {
  fn allocate_id(&mut self) -> Id {
    self.tree.allocate_id()
  }
  fn create_element(&mut self, element: CreateElement) -> Result<(), InterpretError> {
    self.tree.create_element(element)
  }
  fn create_text(&mut self, text: UnitPlacement) -> Result<(), InterpretError> {
    self.tree.create_text(text)
  }
  fn create_dynamic_beacon(&mut self, beacon: UnitPlacement) -> Result<(), InterpretError> {
    self.tree.create_dynamic_beacon(beacon)
  }
  fn create_root(&mut self, id: Id) -> Result<(), InterpretError> {
    self.tree.create_root(id)
  }
  fn attach_to_parent(&mut self, attach: AttachToParent) -> Result<(), InterpretError> {
    self.tree.attach_to_parent(attach)
  }
  fn set_property(&mut self, id: Id, key: &str, value: &str) -> Result<(), InterpretError> {
    self.tree.set_property(id, key, value)
  }
  fn set_callback(&mut self, id: Id, key: &str, callback: Callback) -> Result<(), InterpretError> {
    self.tree.set_callback(id, key, callback)
  }
  fn unset_property(&mut self, id: Id, key: &str) -> Result<(), InterpretError> {
    self.tree.unset_property(id, key)
  }
  fn set_text(&mut self, id: Id, text: &str) -> Result<(), InterpretError> {
    if text == self.refused {
      return Err(InterpretError::Backend(format!("refused {}", text)));
    }
    self.tree.set_text(id, text)
  }
  fn reposition(&mut self, id: Id, pos: usize) -> Result<(), InterpretError> {
    self.tree.reposition(id, pos)
  }
  fn disconnect(&mut self, disconnect: Disconnect) -> Result<(), InterpretError> {
    self.tree.disconnect(disconnect)
  }
  fn delete_from_cache(&mut self, id: Id) -> Result<(), InterpretError> {
    self.tree.delete_from_cache(id)
  }
}

fn refusing(refused: &'static str) -> Refusing {
  Refusing {
    tree: MemoryTree::new(),
    refused,
  }
}

#[test]
fn fault_surfaces_test() {
  println!("START fault_surfaces_test");
  testing::bounded_context(|| {
    init_logging();
    let text = BasicSubject::new();
    let node: Node = Element::text(Poll::from_event(&text.event())).into();
    let mount = RuntimeBuilder::new().build().mount(node, refusing("boom")).unwrap();
    text.push("fine".to_owned());
    assert!(mount.take_fault().is_none());
    text.push("boom".to_owned());
    text.push("later".to_owned());
    assert_eq!(
      mount.take_fault(),
      Some(InterpretError::Backend("refused boom".to_owned()))
    );
    assert!(!mount.is_halted());
    assert_eq!(mount.with_interpreter(|backend| backend.tree.text_content(Id::ROOT)), "later");
  });
  println!("END fault_surfaces_test");
}

#[test]
fn fault_while_mounting_test() {
  println!("START fault_while_mounting_test");
  testing::bounded_context(|| {
    let node: Node = Element::text_static("boom").into();
    let result = RuntimeBuilder::new().build().mount(node, refusing("boom"));
    assert_eq!(
      result.err(),
      Some(InterpretError::Backend("refused boom".to_owned()))
    );
  });
  println!("END fault_while_mounting_test");
}

#[test]
fn halt_on_fault_test() {
  println!("START halt_on_fault_test");
  testing::bounded_context(|| {
    let text = BasicSubject::new();
    let node: Node = Element::text(Poll::from_event(&text.event())).into();
    let mut mount = RuntimeBuilder::new()
      .halt_on_fault(true)
      .build()
      .mount(node, refusing("boom"))
      .unwrap();
    text.push("fine".to_owned());
    text.push("boom".to_owned());
    text.push("later".to_owned());
    assert!(mount.is_halted());
    assert_eq!(mount.with_interpreter(|backend| backend.tree.text_content(Id::ROOT)), "fine");
    mount.unmount().unwrap_err();
    // Teardown is dropped along with everything else after the halt.
    assert!(mount.with_interpreter(|backend| backend.tree.contains(Id::ROOT)));
  });
  println!("END halt_on_fault_test");
}
