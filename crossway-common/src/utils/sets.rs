use std::collections::HashSet;
use std::hash::Hash;

/// Removes every occurrence of `value`. Returns `true` if anything was removed.
pub fn remove_value<T: PartialEq>(items: &mut Vec<T>, value: &T) -> bool {
    let before = items.len();
    items.retain(|v| v != value);
    items.len() != before
}

/// Elements of `a` not present in `b`, keeping `a`'s order.
pub fn difference<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let exclude: HashSet<&T> = b.iter().collect();
    a.iter().filter(|v| !exclude.contains(v)).cloned().collect()
}
