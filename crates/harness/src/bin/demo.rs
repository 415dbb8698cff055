//! Small end-to-end demo over the mock PIR backend

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use veilfeed_anns::LshParams;
use veilfeed_harness::{generate_planted_data, Pipeline};
use veilfeed_server::ServerConfig;
use veilfeed_vector::DistanceMetric;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut rng = ChaCha20Rng::seed_from_u64(7);

    let dim = 32;
    let num_base = 500;
    let num_nn = 4;
    let (data, queries, planted) = generate_planted_data(
        num_base,
        dim,
        -50.0,
        50.0,
        1,
        num_nn,
        DistanceMetric::Euclidean,
        10.0,
        &mut rng,
    )?;
    let num_items = data.len();

    let lsh = LshParams {
        num_features: dim,
        num_tables: 6,
        num_probes: 2,
        num_projections: 2,
        approximation_factor: 2.0,
        projection_width: 40.0,
        hash_bytes: 8,
        metric: DistanceMetric::Euclidean,
        bucket_cap: Some(32),
    };
    let item_bytes = 64;
    let items: Vec<u8> = (0..num_items * item_bytes).map(|i| (i % 251) as u8).collect();

    let config = ServerConfig::new(lsh, num_items, item_bytes);
    let pipeline = Pipeline::new(config, data, items, &mut rng)?;

    let (client, session_id) = pipeline.open_client(queries[0].clone(), &mut rng)?;

    // mint a token for the request
    let keys = pipeline.server().token_keys();
    let blind = keys.public.issue(&mut rng)?;
    let signed = keys.secret.sign(&blind.b);
    let token = keys.public.unblind(&signed, &blind);

    let candidates = pipeline.query_candidates(&client, &session_id, Some(token), &mut rng)?;
    let hits = planted[0]
        .iter()
        .filter(|&&id| candidates.contains(&(id as u32)))
        .count();

    println!("query returned {} candidates", candidates.len());
    println!("planted neighbors recovered: {hits}/{num_nn}");
    println!(
        "naive baseline would have shipped {} bytes",
        pipeline.server().naive_bandwidth_bytes()
    );

    if let Some(&first) = candidates.first() {
        let item = pipeline.fetch_item(&client, &session_id, first as u64)?;
        println!("fetched item {first}: {} bytes", item.len());
    }

    Ok(())
}
