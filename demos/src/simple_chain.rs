//! Runs three phases of a CSBulk-style aggregate over five clients served by three servers,
//! and prints every client's recovered payload each phase, demonstrating that the shared
//! cleartext carries exactly what every client wrote to its own slot (spec §8 Scenario A).

use dissent_core::testing::run_bulk_scenario_happy_path;

fn main() {
    const NUM_SERVERS: usize = 3;
    const NUM_CLIENTS: usize = 5;
    const NUM_PHASES: usize = 3;
    const PAYLOAD_LEN: usize = 32;

    let result = run_bulk_scenario_happy_path(NUM_SERVERS, NUM_CLIENTS, NUM_PHASES, PAYLOAD_LEN, |client_idx, phase| {
        vec![(client_idx * 17 + phase * 3 + 1) as u8; PAYLOAD_LEN]
    });

    for (phase, payloads) in result.recovered_payloads.iter().enumerate() {
        for (client_idx, payload) in payloads.iter().enumerate() {
            let expected = vec![(client_idx * 17 + phase * 3 + 1) as u8; PAYLOAD_LEN];
            assert_eq!(payload, &expected, "client {client_idx} phase {phase} must decode what it wrote");
        }
        println!("phase {phase}: {NUM_CLIENTS} clients, {} bytes of cleartext", result.cleartexts[phase].len());
    }
}
