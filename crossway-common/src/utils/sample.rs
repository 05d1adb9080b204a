use rand::seq::SliceRandom;
use rand::Rng;

/// Picks `n` distinct entries of `items` uniformly, without replacement.
/// `n` is capped at `items.len()`.
pub fn select_random<T: Clone, R: Rng + ?Sized>(items: &[T], n: usize, rng: &mut R) -> Vec<T> {
    items.choose_multiple(rng, n.min(items.len())).cloned().collect()
}
