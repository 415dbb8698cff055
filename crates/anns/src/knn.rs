//! Brute-force post-filtering of index candidates

use veilfeed_vector::{distance, DistanceMetric, Vector};

use crate::error::{AnnsError, Result};

/// Scale factor applied to float distances before comparison, so ranking is
/// deterministic even when two distances compare equal as floats.
const DISTANCE_SCALE: f64 = 1_000_000.0;

/// Rank candidates by distance to the query and return the ids of the top
/// k. Candidates are deduplicated by id (first occurrence wins) and ties
/// keep first-seen order.
pub fn brute_force_top_k(
    query: &Vector,
    candidates: &[&Vector],
    ids: &[u32],
    metric: DistanceMetric,
    k: usize,
) -> Result<Vec<u32>> {
    if candidates.is_empty() || candidates.len() != ids.len() {
        return Err(AnnsError::EmptyInput);
    }

    let mut seen = std::collections::BTreeSet::new();
    let mut ranked: Vec<(u32, i64)> = Vec::with_capacity(candidates.len());
    for (point, &id) in candidates.iter().zip(ids) {
        if !seen.insert(id) {
            continue;
        }
        let dist = distance(metric, query, point)?;
        ranked.push((id, (dist * DISTANCE_SCALE) as i64));
    }

    ranked.sort_by_key(|&(_, dist)| dist);
    ranked.truncate(k);
    Ok(ranked.into_iter().map(|(id, _)| id).collect())
}

/// Candidates sorted by the frequency with which their id appears, most
/// frequent first.
pub fn sorted_by_frequency(ids: &[u32]) -> Result<Vec<u32>> {
    if ids.is_empty() {
        return Err(AnnsError::EmptyInput);
    }

    let mut counts: std::collections::BTreeMap<u32, (usize, usize)> = Default::default();
    for (pos, &id) in ids.iter().enumerate() {
        let entry = counts.entry(id).or_insert((0, pos));
        entry.0 += 1;
    }

    let mut ranked: Vec<(u32, usize, usize)> = counts
        .into_iter()
        .map(|(id, (count, first))| (id, count, first))
        .collect();
    // most frequent first; ties resolved by first appearance
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    Ok(ranked.into_iter().map(|(id, _, _)| id).collect())
}

/// The candidate represented by the most ids, if any candidates exist
pub fn majority_candidate(ids: &[u32]) -> Result<u32> {
    Ok(sorted_by_frequency(ids)?[0])
}
