//! Runs a three-server Neff shuffle over a handful of client submissions and checks that the
//! final cleartexts are exactly the submitted plaintexts, just reordered.

use dissent_core::crypto::group_math::{IntegerGroup, Scalar};
use dissent_core::shuffle::kind::ShuffleKind;
use dissent_core::shuffle::protocol::{client_submit, joint_public_key, EphemeralKeys, ShuffleRun};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn main() {
    let group = IntegerGroup::toy();
    let mut rng = ChaCha20Rng::seed_from_u64(1);

    let ephemeral: Vec<_> = (0..3).map(|_| EphemeralKeys::generate(&group, &mut rng)).collect();
    let server_keys: Vec<_> = ephemeral.iter().map(|e| e.public.clone()).collect();
    let joint_pk = joint_public_key(&group, &server_keys);

    let runs: Vec<ShuffleRun> = ephemeral
        .iter()
        .map(|e| ShuffleRun {
            kind: ShuffleKind::NeffDataShuffle,
            group: group.clone(),
            joint_pk: joint_pk.clone(),
            ephemeral: EphemeralKeys {
                secret: e.secret.clone(),
                public: e.public.clone(),
            },
            server_public_keys: server_keys.clone(),
        })
        .collect();

    let plaintexts: Vec<_> = [7u64, 42, 99].iter().map(|v| group.pow_g(&Scalar::from_u64(*v, &group))).collect();
    let submissions: Vec<_> = plaintexts.iter().map(|p| client_submit(&group, &joint_pk, p, &mut rng)).collect();

    let mut input = submissions;
    let mut previous_step = None;
    for (idx, run) in runs.iter().enumerate() {
        let previous_server_index = if idx == 0 { None } else { Some(idx - 1) };
        let step = run
            .verify_and_step(previous_server_index, &input, previous_step.as_ref(), &mut rng)
            .expect("every server's transcript verifies");
        input = step.output.clone();
        previous_step = Some(step);
    }

    let final_step = previous_step.expect("at least one server ran");
    let recovered: Vec<_> = final_step.output.iter().map(|c| c.phi.clone()).collect();
    for plaintext in &plaintexts {
        assert!(recovered.contains(plaintext), "every submitted plaintext survives the shuffle");
    }
    println!(
        "shuffled {} submissions across {} servers; every plaintext recovered, permutation hidden",
        plaintexts.len(),
        runs.len()
    );
}
