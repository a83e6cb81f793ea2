use cadence::deferred::{DeferralPath, DeferredQueue};
use proptest::prelude::*;

fn covers(prefix: &DeferralPath, path: &DeferralPath) -> bool {
  path.segments().starts_with(prefix.segments())
}

#[test]
fn force_flushes_nested_paths_test() {
  println!("START force_flushes_nested_paths_test");
  let mut queue = DeferredQueue::new();
  queue.defer(DeferralPath::new(vec![1, 2]), "b");
  queue.defer(DeferralPath::new(vec![2]), "c");
  queue.defer(DeferralPath::new(vec![1]), "a");
  assert_eq!(queue.force(&DeferralPath::new(vec![1])), ["a", "b"]);
  assert_eq!(queue.force(&DeferralPath::new(vec![2])), ["c"]);
  assert!(queue.is_empty());
  println!("END force_flushes_nested_paths_test");
}

proptest! {
  #[test]
  fn force_matches_sorted_filter(
    entries in prop::collection::vec((prop::collection::vec(0u64..4, 0..4), any::<u16>()), 0..40),
    forced in prop::collection::vec(0u64..4, 0..3),
  ) {
    let forced = DeferralPath::new(forced);
    let mut queue = DeferredQueue::new();
    for (path, payload) in entries.iter() {
      queue.defer(DeferralPath::new(path.clone()), *payload);
    }
    let mut expected: Vec<(DeferralPath, usize, u16)> = entries
      .iter()
      .enumerate()
      .map(|(idx, (path, payload))| (DeferralPath::new(path.clone()), idx, *payload))
      .filter(|(path, _, _)| covers(&forced, path))
      .collect();
    expected.sort();
    let expected: Vec<u16> = expected.into_iter().map(|(_, _, payload)| payload).collect();
    prop_assert_eq!(queue.force(&forced), expected.clone());
    prop_assert_eq!(queue.len(), entries.len() - expected.len());
    prop_assert!(queue.paths().all(|path| !covers(&forced, path)));
  }
}
