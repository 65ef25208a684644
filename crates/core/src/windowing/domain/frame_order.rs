use std::collections::BTreeSet;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Indices a pass visits, in visiting order.
pub fn sequential(range: Range<usize>) -> Vec<usize> {
    range.collect()
}

/// The same indices permuted with the thread-local RNG. Each call draws a
/// fresh permutation.
pub fn shuffled(range: Range<usize>) -> Vec<usize> {
    let mut order: Vec<usize> = range.collect();
    order.shuffle(&mut rand::rng());
    order
}

pub fn for_pass(range: Range<usize>, random_order: bool) -> Vec<usize> {
    if random_order {
        shuffled(range)
    } else {
        sequential(range)
    }
}

/// Picks `floor(len * ratio)` distinct indices of `range`, reproducibly for
/// a given seed. The set iterates in ascending order.
pub fn seeded_subset(range: Range<usize>, ratio: f64, seed: u64) -> BTreeSet<usize> {
    let len = range.len();
    let amount = ((len as f64 * ratio).floor() as usize).min(len);
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, len, amount)
        .into_iter()
        .map(|offset| range.start + offset)
        .collect()
}
