//! In-place uniform permutation.

use rand::Rng;

/// Permutes `items` in place, uniformly at random.
///
/// For `i` from the last index down to 1, draws `j` uniformly from `[0, i]`
/// and swaps `items[i]` with `items[j]`. The permutation always covers the
/// whole slice. Slices with fewer than two elements are left untouched and
/// consume no randomness.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
