//! Work deferred until a subtree is torn down.
//!
//! Entries are keyed by a [DeferralPath]. Paths order lexicographically, with
//! a prefix sorting before its extensions, so forcing a path flushes the work
//! of that subtree and of every subtree nested under it in a single range.
use std::collections::BTreeMap;
use std::fmt;

/// A position in the tree of deferral scopes
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferralPath(Vec<u64>);

impl DeferralPath {
  pub fn new(segments: Vec<u64>) -> Self {
    DeferralPath(segments)
  }

  /// The empty path, which covers every other path
  pub fn root() -> Self {
    DeferralPath(Vec::new())
  }

  pub fn child(&self, segment: u64) -> Self {
    let mut segments = self.0.clone();
    segments.push(segment);
    DeferralPath(segments)
  }

  pub fn extend(&self, segments: &[u64]) -> Self {
    let mut extended = self.0.clone();
    extended.extend_from_slice(segments);
    DeferralPath(extended)
  }

  pub fn segments(&self) -> &[u64] {
    &self.0
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  /// The first path after every path this one covers, or `None` when the
  /// covered range is unbounded
  pub fn successor(&self) -> Option<Self> {
    let mut segments = self.0.clone();
    while let Some(last) = segments.pop() {
      if let Some(next) = last.checked_add(1) {
        segments.push(next);
        return Some(DeferralPath(segments));
      }
    }
    None
  }
}

impl From<Vec<u64>> for DeferralPath {
  fn from(segments: Vec<u64>) -> Self {
    DeferralPath(segments)
  }
}

impl fmt::Display for DeferralPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (idx, segment) in self.0.iter().enumerate() {
      if idx > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{}", segment)?;
    }
    write!(f, "]")
  }
}

/// Entries waiting on a deferral path
///
/// # Example
/// ```
/// use cadence::deferred::{DeferralPath, DeferredQueue};
///
/// let mut queue = DeferredQueue::new();
/// queue.defer(DeferralPath::new(vec![2]), "c");
/// queue.defer(DeferralPath::new(vec![1, 2]), "b");
/// queue.defer(DeferralPath::new(vec![1]), "a");
/// assert_eq!(queue.force(&DeferralPath::new(vec![1])), ["a", "b"]);
/// assert!(queue.force(&DeferralPath::new(vec![1])).is_empty());
/// assert_eq!(queue.drain(), ["c"]);
/// ```
#[derive(Debug)]
pub struct DeferredQueue<P> {
  pending: BTreeMap<DeferralPath, Vec<P>>,
}

impl<P> Default for DeferredQueue<P> {
  fn default() -> Self {
    DeferredQueue {
      pending: BTreeMap::new(),
    }
  }
}

impl<P> DeferredQueue<P> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `payload` after everything already deferred at `path`
  pub fn defer(&mut self, path: DeferralPath, payload: P) {
    self.pending.entry(path).or_default().push(payload);
  }

  /// Removes and returns, in key order, everything deferred at `path` or
  /// under it
  pub fn force(&mut self, path: &DeferralPath) -> Vec<P> {
    let mut range = self.pending.split_off(path);
    if let Some(end) = path.successor() {
      let mut rest = range.split_off(&end);
      self.pending.append(&mut rest);
    }
    range.into_values().flatten().collect()
  }

  /// Removes and returns everything, in key order
  pub fn drain(&mut self) -> Vec<P> {
    std::mem::take(&mut self.pending)
      .into_values()
      .flatten()
      .collect()
  }

  /// The number of deferred entries
  pub fn len(&self) -> usize {
    self.pending.values().map(|list| list.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn paths(&self) -> impl Iterator<Item = &DeferralPath> {
    self.pending.keys()
  }
}
