//! A simple example of what cadence has to offer
//!
//! Mounts a shuffled list onto an in-memory tree, moves and removes some of
//! its entries and prints the tree after every step.
//!
//! Run with `RUST_LOG=cadence=debug` to see the slot lifecycle.

use cadence::event::subject::{BasicSubject, Subject};
use cadence::interpret::tree::MemoryTree;
use cadence::poll::Poll;
use cadence::reconcile::element::Element;
use cadence::reconcile::instruction::Attribute;
use cadence::reconcile::{Control, Node, Slot};
use cadence::runtime::{Mount, RuntimeBuilder};

use rand::seq::SliceRandom;

fn show(step: &str, mount: &Mount<MemoryTree>) {
  println!("{:>10}: {}", step, mount.with_interpreter(|tree| tree.render_root()));
}

fn main() {
  env_logger::init();
  let title = BasicSubject::new();
  let slots = BasicSubject::new();
  let node: Node = Element::new(
    "section",
    vec![Poll::pure(Attribute::prop("class", "fruit"))],
    vec![
      Element::new(
        "h1",
        vec![],
        vec![Element::text(Poll::from_event(&title.event())).into()],
      )
      .into(),
      Element::new("ul", vec![], vec![Node::dynamic(slots.event())]).into(),
    ],
  )
  .into();
  let runtime = RuntimeBuilder::new().trace_instructions(true).build();
  let mut mount = match runtime.mount(node, MemoryTree::new()) {
    Ok(mount) => mount,
    Err(fault) => {
      eprintln!("failed to mount: {}", fault);
      return;
    }
  };
  title.push("Fruit".to_owned());

  let mut fruit = vec!["apple", "banana", "cherry", "damson", "elderberry"];
  fruit.shuffle(&mut rand::thread_rng());
  let controls: Vec<BasicSubject<Control>> = fruit.iter().map(|_| BasicSubject::new()).collect();
  for (pos, (name, control)) in fruit.iter().zip(controls.iter()).enumerate() {
    let item = Element::new("li", vec![], vec![Element::text_static(name).into()]).positioned(pos);
    slots.push(Slot::new(item.into(), control.event()));
  }
  show("shuffled", &mount);

  // Sort the list by moving each entry to its rank.
  let mut ranked: Vec<usize> = (0..fruit.len()).collect();
  ranked.sort_by_key(|&idx| fruit[idx]);
  for (rank, idx) in ranked.iter().enumerate() {
    controls[*idx].push(Control::Logic(rank));
  }
  show("sorted", &mount);

  let removed = ranked[0];
  controls[removed].push(Control::Remove);
  title.push(format!("Fruit without {}", fruit[removed]));
  show("removed", &mount);

  if let Err(fault) = mount.unmount() {
    eprintln!("failed to unmount: {}", fault);
  }
  show("unmounted", &mount);
}
