//! Cross-crate integration tests
//!
//! Statistical recall properties of the LSH layer, distributional checks
//! on the token layer, and end-to-end orchestrator scenarios over the
//! mock PIR backend.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use uuid::Uuid;

use veilfeed_anns::{Lsh, LshIndex, LshParams};
use veilfeed_client::Client;
use veilfeed_harness::{generate_planted_data, Pipeline};
use veilfeed_pir::mock::MockPirClient;
use veilfeed_server::{ServerConfig, ServerError};
use veilfeed_token::{CurveId, KeyPair};
use veilfeed_vector::{perturb, DistanceMetric, Vector};

fn euclidean_params(dim: usize, tables: usize, projections: usize, width: f64) -> LshParams {
    LshParams {
        num_features: dim,
        num_tables: tables,
        num_probes: 1,
        num_projections: projections,
        approximation_factor: 2.0,
        projection_width: width,
        hash_bytes: 8,
        metric: DistanceMetric::Euclidean,
        bucket_cap: Some(64),
    }
}

// =========================================================================
// Section 1: LSH recall
// =========================================================================

mod lsh_recall_tests {
    use super::*;

    /// A stored point always lands in its own bucket, and a point one
    /// unit away shares it with high probability at width 50.
    #[test]
    fn test_single_table_collision() {
        let mut exact_hits = 0;
        let mut near_hits = 0;
        let trials = 200;

        for trial in 0..trials {
            let mut rng = ChaCha20Rng::seed_from_u64(42 + trial);
            let params = euclidean_params(8, 1, 1, 50.0);
            let mut index = LshIndex::new(params, &mut rng).unwrap();

            let v = Vector::from_values(vec![10.0; 8]).unwrap();
            index.build(vec![v.clone()]).unwrap();

            let (_, ids) = index.query(&v).unwrap();
            if ids == vec![0] {
                exact_hits += 1;
            }

            let mut shifted = v.clone();
            shifted.add_to_coord(0, 1.0).unwrap();
            let (_, ids) = index.query(&shifted).unwrap();
            if ids.contains(&0) {
                near_hits += 1;
            }
        }

        // exact self-collision is deterministic
        assert_eq!(exact_hits, trials);
        // one unit against width 50 collides with probability ~0.98
        assert!(near_hits >= 180, "near hits {near_hits}/{trials}");
    }

    /// Amplified recall stays above 1 - (1 - p1^k)^L. At width 8 and
    /// distance 1, p1 ~ 0.90, so k=2, L=4 gives a bound of ~0.9987.
    #[test]
    fn test_amplified_recall_bound() {
        let mut hits = 0;
        let trials = 200;

        for trial in 0..trials {
            let mut rng = ChaCha20Rng::seed_from_u64(1000 + trial);
            let params = euclidean_params(16, 4, 2, 8.0);
            let mut index = LshIndex::new(params, &mut rng).unwrap();

            let v = Vector::random(16, -50.0, 50.0, &mut rng).unwrap();
            let near = perturb(&v, DistanceMetric::Euclidean, 1.0, &mut rng).unwrap();
            index.build(vec![v]).unwrap();

            let (_, ids) = index.query(&near).unwrap();
            if ids.contains(&0) {
                hits += 1;
            }
        }

        assert!(hits >= 180, "amplified recall {hits}/{trials}");
    }

    /// Hamming recall: ten ones perturbed by two flips against a k=4
    /// composed hash collides with probability ~(1 - 2/10)^4 ~ 0.41.
    #[test]
    fn test_hamming_recall() {
        let mut rng = ChaCha20Rng::seed_from_u64(2000);
        let mut hits = 0;
        let trials = 1000;

        let ones = Vector::from_values(vec![1.0; 10]).unwrap();
        for _ in 0..trials {
            let lsh = Lsh::new_hamming(10, 4, &mut rng).unwrap();
            let flipped = perturb(&ones, DistanceMetric::Hamming, 2.0, &mut rng).unwrap();
            if lsh.digest(&ones).unwrap() == lsh.digest(&flipped).unwrap() {
                hits += 1;
            }
        }

        assert!(hits >= 350, "hamming recall {hits}/{trials}");
    }
}

// =========================================================================
// Section 2: token distribution
// =========================================================================

mod token_distribution_tests {
    use super::*;

    /// Blinded points from independent issues under one key are fresh
    /// uniform-looking curve points: no repeats, and their leading
    /// x-coordinate bytes spread over the byte space.
    #[test]
    fn test_blinded_points_unlinkable() {
        let mut rng = ChaCha20Rng::seed_from_u64(3000);
        let kp = KeyPair::generate(CurveId::P256, &mut rng).unwrap();

        let mut encodings = std::collections::BTreeSet::new();
        let mut first_bytes = std::collections::BTreeSet::new();
        for _ in 0..64 {
            let bt = kp.public.issue(&mut rng).unwrap();
            let encoded = bt.b.encode();
            first_bytes.insert(encoded[1]);
            assert!(encodings.insert(encoded), "blinded point repeated");
        }

        assert!(
            first_bytes.len() >= 30,
            "leading bytes clustered: {} distinct",
            first_bytes.len()
        );
    }
}

// =========================================================================
// Section 3: orchestrator end-to-end
// =========================================================================

mod orchestrator_tests {
    use super::*;

    fn build_pipeline(
        rng: &mut ChaCha20Rng,
        num_items: usize,
        dim: usize,
        tables: usize,
        require_token: bool,
        n_parallel: u32,
    ) -> (Pipeline, Vec<Vector>) {
        let data: Vec<Vector> = (0..num_items)
            .map(|_| Vector::random(dim, -50.0, 50.0, rng).unwrap())
            .collect();
        let item_bytes = 16;
        let items: Vec<u8> = (0..num_items * item_bytes).map(|i| (i % 251) as u8).collect();

        let mut config = ServerConfig::new(
            euclidean_params(dim, tables, 2, 50.0),
            num_items,
            item_bytes,
        );
        config.require_token = require_token;
        config.n_parallel = n_parallel;

        let pipeline = Pipeline::new(config, data.clone(), items, rng).unwrap();
        (pipeline, data)
    }

    /// One answer slot per (table, probe) pair, each with one shard per
    /// parallel partition; reordering shards does not change recovery.
    #[test]
    fn test_fan_out_shape_and_shard_order() {
        let mut rng = ChaCha20Rng::seed_from_u64(4000);
        let (pipeline, data) = build_pipeline(&mut rng, 64, 8, 4, false, 2);

        let (client, session_id) = pipeline.open_client(data[3].clone(), &mut rng).unwrap();
        let (request, pending) = client.build_bucket_query(None, &mut rng).unwrap();
        let response = pipeline
            .server()
            .private_bucket_query(&session_id, &request)
            .unwrap();

        assert_eq!(response.answers.len(), 4);
        for (_, shards) in &response.answers {
            assert_eq!(shards.len(), 2);
        }

        let recovered = client.recover_buckets(&pending, &response).unwrap();

        let mut swapped = response.clone();
        for (_, shards) in &mut swapped.answers {
            shards.swap(0, 1);
        }
        let recovered_swapped = client.recover_buckets(&pending, &swapped).unwrap();

        for (a, b) in recovered.iter().zip(&recovered_swapped) {
            assert_eq!(a.ids, b.ids);
        }
    }

    /// Querying with a stored profile recovers that profile's own id.
    #[test]
    fn test_self_query_finds_own_id() {
        let mut rng = ChaCha20Rng::seed_from_u64(4100);
        let (pipeline, data) = build_pipeline(&mut rng, 64, 8, 4, false, 1);

        let (client, session_id) = pipeline.open_client(data[17].clone(), &mut rng).unwrap();
        let candidates = pipeline
            .query_candidates(&client, &session_id, None, &mut rng)
            .unwrap();
        assert!(candidates.contains(&17), "candidates: {candidates:?}");
    }

    /// A token-gated server rejects missing and tampered tokens and
    /// accepts a freshly minted one.
    #[test]
    fn test_token_gating() {
        let mut rng = ChaCha20Rng::seed_from_u64(4200);
        let (pipeline, data) = build_pipeline(&mut rng, 32, 8, 2, true, 1);
        let (client, session_id) = pipeline.open_client(data[0].clone(), &mut rng).unwrap();

        // no token
        let result = pipeline.query_candidates(&client, &session_id, None, &mut rng);
        assert!(matches!(
            result,
            Err(veilfeed_harness::HarnessError::Server(
                ServerError::InvalidToken
            ))
        ));

        // valid token
        let keys = pipeline.server().token_keys();
        let blind = keys.public.issue(&mut rng).unwrap();
        let signed = keys.secret.sign(&blind.b);
        let token = keys.public.unblind(&signed, &blind);
        pipeline
            .query_candidates(&client, &session_id, Some(token.clone()), &mut rng)
            .unwrap();

        // tampered token
        let mut bad = token;
        bad.t[0] ^= 0x01;
        let result = pipeline.query_candidates(&client, &session_id, Some(bad), &mut rng);
        assert!(matches!(
            result,
            Err(veilfeed_harness::HarnessError::Server(
                ServerError::InvalidToken
            ))
        ));
    }

    /// Private item fetch returns the same bytes as the plain baseline.
    #[test]
    fn test_item_fetch_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(4300);
        let (pipeline, data) = build_pipeline(&mut rng, 64, 8, 2, false, 1);
        let (client, session_id) = pipeline.open_client(data[0].clone(), &mut rng).unwrap();

        let item = pipeline.fetch_item(&client, &session_id, 5).unwrap();
        let expected: Vec<u8> = (5 * 16..6 * 16).map(|i| (i % 251) as u8).collect();
        assert_eq!(item, expected);

        let request = veilfeed_protocol::ItemQueryRequestPayload::Plain { index: 5 };
        let plain = pipeline
            .server()
            .item_query(&session_id, &request)
            .unwrap();
        assert_eq!(plain.item, item);
    }

    /// A terminated session stops answering.
    #[test]
    fn test_terminate_session() {
        let mut rng = ChaCha20Rng::seed_from_u64(4400);
        let (pipeline, data) = build_pipeline(&mut rng, 32, 8, 2, false, 1);
        let (client, session_id) = pipeline.open_client(data[0].clone(), &mut rng).unwrap();

        pipeline.server().terminate_session(&session_id);
        let result = pipeline.query_candidates(&client, &session_id, None, &mut rng);
        assert!(matches!(
            result,
            Err(veilfeed_harness::HarnessError::Server(
                ServerError::SessionNotFound(_)
            ))
        ));
    }

    /// Unknown sessions are rejected outright.
    #[test]
    fn test_unknown_session_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(4500);
        let (pipeline, data) = build_pipeline(&mut rng, 32, 8, 2, false, 1);
        let (client, _) = pipeline.open_client(data[0].clone(), &mut rng).unwrap();

        let bogus = Uuid::new_v4();
        let (request, _) = client.build_bucket_query(None, &mut rng).unwrap();
        assert!(pipeline
            .server()
            .private_bucket_query(&bogus, &request)
            .is_err());
    }

    /// End-to-end recall on planted near neighbors: with 8 tables of
    /// width 40 against distance 5, nearly every query should surface at
    /// least one of its planted neighbors.
    #[test]
    fn test_planted_neighbor_recall() {
        let mut rng = ChaCha20Rng::seed_from_u64(4600);
        let (data, queries, planted) = generate_planted_data(
            200,
            16,
            -50.0,
            50.0,
            10,
            3,
            DistanceMetric::Euclidean,
            5.0,
            &mut rng,
        )
        .unwrap();
        let num_items = data.len();
        let item_bytes = 8;
        let items = vec![0u8; num_items * item_bytes];

        let config = ServerConfig::new(
            euclidean_params(16, 8, 2, 40.0),
            num_items,
            item_bytes,
        );
        let pipeline = Pipeline::new(config, data, items, &mut rng).unwrap();

        let mut queries_with_hit = 0;
        for (query, neighbor_ids) in queries.iter().zip(&planted) {
            let (client, session_id) = pipeline.open_client(query.clone(), &mut rng).unwrap();
            let candidates = pipeline
                .query_candidates(&client, &session_id, None, &mut rng)
                .unwrap();
            if neighbor_ids
                .iter()
                .any(|&id| candidates.contains(&(id as u32)))
            {
                queries_with_hit += 1;
            }
            pipeline.server().terminate_session(&session_id);
        }

        assert!(queries_with_hit >= 8, "hits for {queries_with_hit}/10 queries");
    }
}

// =========================================================================
// Section 4: determinism under seeded RNG
// =========================================================================

mod determinism_tests {
    use super::*;

    /// Two servers built from the same seed enumerate byte-identical
    /// bucket keys.
    #[test]
    fn test_seeded_build_reproducible() {
        let build = || {
            let mut rng = ChaCha20Rng::seed_from_u64(5000);
            let data: Vec<Vector> = (0..128)
                .map(|_| Vector::random(8, -50.0, 50.0, &mut rng).unwrap())
                .collect();
            let mut index =
                LshIndex::new(euclidean_params(8, 4, 2, 50.0), &mut rng).unwrap();
            index.build(data).unwrap();
            index
                .table_keys()
                .into_iter()
                .map(|keys| {
                    keys.into_iter()
                        .map(|k| k.as_bytes().to_vec())
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    /// Identically seeded clients produce identical query requests.
    #[test]
    fn test_seeded_query_reproducible() {
        let run = || {
            let mut rng = ChaCha20Rng::seed_from_u64(5100);
            let data: Vec<Vector> = (0..64)
                .map(|_| Vector::random(8, -50.0, 50.0, &mut rng).unwrap())
                .collect();
            let items = vec![0u8; 64 * 8];
            let config = ServerConfig::new(euclidean_params(8, 4, 2, 50.0), 64, 8);
            let pipeline = Pipeline::new(config, data.clone(), items, &mut rng).unwrap();

            let (client, _) = pipeline.open_client(data[0].clone(), &mut rng).unwrap();
            let (request, _) = client.build_bucket_query(None, &mut rng).unwrap();
            request
                .queries
                .into_iter()
                .map(|(slot, q)| (slot, q.blob))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}

// =========================================================================
// Section 5: post-filtering over recovered candidates
// =========================================================================

mod post_filter_tests {
    use super::*;
    use veilfeed_anns::brute_force_top_k;

    /// Recovered candidates rank by true distance through the
    /// brute-force post-filter.
    #[test]
    fn test_candidates_rank_by_distance() {
        let mut rng = ChaCha20Rng::seed_from_u64(6000);
        let data: Vec<Vector> = (0..64)
            .map(|_| Vector::random(8, -50.0, 50.0, &mut rng).unwrap())
            .collect();
        let items = vec![0u8; 64 * 8];
        let config = ServerConfig::new(euclidean_params(8, 6, 2, 50.0), 64, 8);
        let pipeline = Pipeline::new(config, data.clone(), items, &mut rng).unwrap();

        let profile = data[9].clone();
        let (client, session_id) = pipeline.open_client(profile.clone(), &mut rng).unwrap();
        let candidates = pipeline
            .query_candidates(&client, &session_id, None, &mut rng)
            .unwrap();
        assert!(!candidates.is_empty());

        let vectors: Vec<&Vector> = candidates.iter().map(|&id| &data[id as usize]).collect();
        let top = brute_force_top_k(
            &profile,
            &vectors,
            &candidates,
            DistanceMetric::Euclidean,
            3,
        )
        .unwrap();

        // the profile is item 9; nothing is closer than itself
        assert_eq!(top[0], 9);
    }

    #[test]
    fn test_merged_candidates_preserve_first_seen_order() {
        let buckets = vec![
            veilfeed_client::RecoveredBucket {
                table: 0,
                probe: 0,
                ids: vec![4, 2],
            },
            veilfeed_client::RecoveredBucket {
                table: 1,
                probe: 0,
                ids: vec![2, 8],
            },
        ];
        assert_eq!(
            Client::<MockPirClient>::merged_candidates(&buckets),
            vec![4, 2, 8]
        );
    }
}
