//! Benchmarks the per-participant cost of the two round families' hot paths: producing and
//! verifying one server's shuffle step, and generating one phase's worth of bulk-round
//! ciphertext.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dissent_core::bulk::ciphertext::{client_ciphertext, per_phase_seed, server_ciphertext};
use dissent_core::crypto::dh::DhKeyPair;
use dissent_core::crypto::group_math::{IntegerGroup, Scalar};
use dissent_core::round_id::{Phase, RoundId};
use dissent_core::shuffle::protocol::{client_submit, joint_public_key, EphemeralKeys, ShuffleRun};
use dissent_core::shuffle::ShuffleKind;
use dissent_core::testing::{run_bulk_scenario_happy_path, test_identity};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn bench_shuffle_step(c: &mut Criterion) {
    let group = IntegerGroup::rfc3526_2048();
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let ephemeral = EphemeralKeys::generate(&group, &mut rng);
    let joint_pk = joint_public_key(&group, &[ephemeral.public.clone()]);

    let submissions: Vec<_> = (0..40)
        .map(|v| client_submit(&group, &joint_pk, &group.pow_g(&Scalar::from_u64(v, &group)), &mut rng))
        .collect();

    let run = ShuffleRun {
        kind: ShuffleKind::NeffDataShuffle,
        group: group.clone(),
        joint_pk: joint_pk.clone(),
        ephemeral: EphemeralKeys {
            secret: ephemeral.secret.clone(),
            public: ephemeral.public.clone(),
        },
        server_public_keys: vec![ephemeral.public.clone()],
    };

    c.bench_function("shuffle_step_40_inputs_2048bit", |b| {
        b.iter_batched(
            || ChaCha20Rng::seed_from_u64(2),
            |mut rng| run.verify_and_step(None, &submissions, None, &mut rng).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_bulk_ciphertext(c: &mut Criterion) {
    let group = IntegerGroup::rfc3526_2048();
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let client = DhKeyPair::generate(&group, &mut rng);
    let servers: Vec<_> = (0..3).map(|_| DhKeyPair::generate(&group, &mut rng)).collect();

    let members: Vec<_> = (0..4).map(|i| test_identity(i as u32)).collect();
    let roster = dissent_core::group::Group::new(members, 3);
    let round_id = RoundId::derive(b"bench", &roster, b"params");

    let aggregate_len = 64 * 1024;
    let per_server_seeds: Vec<[u8; 32]> =
        servers.iter().map(|s| per_phase_seed(&client.agree(&group, &s.public), Phase(0), &round_id)).collect();

    c.bench_function("client_ciphertext_64kb_3_servers", |b| {
        b.iter(|| client_ciphertext(&per_server_seeds, aggregate_len, None))
    });

    let per_client_seeds: Vec<[u8; 32]> = vec![per_server_seeds[0]; 20];
    c.bench_function("server_ciphertext_64kb_20_clients", |b| {
        b.iter(|| server_ciphertext(&per_client_seeds, aggregate_len))
    });
}

fn bench_bulk_scenario(c: &mut Criterion) {
    c.bench_function("bulk_scenario_3_servers_20_clients_1_phase", |b| {
        b.iter(|| run_bulk_scenario_happy_path(3, 20, 1, 256, |client_idx, phase| vec![(client_idx + phase) as u8; 256]))
    });
}

criterion_group!(benches, bench_shuffle_step, bench_bulk_ciphertext, bench_bulk_scenario);
criterion_main!(benches);
