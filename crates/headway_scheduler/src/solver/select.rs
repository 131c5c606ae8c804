use rand::Rng;
use rand::seq::IteratorRandom;

use crate::solver::search::Individual;

/// Tournament selection: sample `size` distinct individuals, keep the one
/// with the lowest cost. Falls back to the whole population when it is
/// smaller than the tournament.
pub fn tournament<'a>(
    individuals: &'a [Individual],
    size: usize,
    rng: &mut impl Rng,
) -> &'a Individual {
    debug_assert!(!individuals.is_empty());

    (0..individuals.len())
        .choose_multiple(rng, size.max(1))
        .into_iter()
        .map(|i| &individuals[i])
        .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
        .expect("tournament over a non-empty population")
}
