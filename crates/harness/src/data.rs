//! Synthetic datasets with planted near neighbors

use rand::Rng;

use veilfeed_vector::{perturb, DistanceMetric, Vector};

use crate::error::Result;

/// Generate random data with planted near neighbors around each query.
///
/// Produces `num` uniform vectors, `num_queries` query points, and for
/// each query `num_nn` neighbors within `max_neighbor_distance`, appended
/// to the data. Returns (data, queries, planted), where planted[q] lists
/// the data indices of query q's neighbors.
pub fn generate_planted_data<R: Rng>(
    num: usize,
    dim: usize,
    value_min: f64,
    value_max: f64,
    num_queries: usize,
    num_nn: usize,
    metric: DistanceMetric,
    max_neighbor_distance: f64,
    rng: &mut R,
) -> Result<(Vec<Vector>, Vec<Vector>, Vec<Vec<usize>>)> {
    let mut values = Vec::with_capacity(num + num_queries * num_nn);
    for _ in 0..num {
        values.push(Vector::random(dim, value_min, value_max, rng)?);
    }

    let mut queries = Vec::with_capacity(num_queries);
    let mut planted = Vec::with_capacity(num_queries);

    for _ in 0..num_queries {
        let query = Vector::random(dim, value_min, value_max, rng)?;
        let mut neighbor_ids = Vec::with_capacity(num_nn);
        for _ in 0..num_nn {
            let neighbor = perturb(&query, metric, max_neighbor_distance, rng)?;
            values.push(neighbor);
            neighbor_ids.push(values.len() - 1);
        }
        queries.push(query);
        planted.push(neighbor_ids);
    }

    Ok((values, queries, planted))
}
