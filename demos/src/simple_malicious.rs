//! Flips a single bit in a published phase's cleartext and shows the corrupted slot's own
//! signature check fails — the detection step that starts the blame sub-protocol in a running
//! round (spec §4.5 step 7).

use dissent_core::bulk::slot::SlotMessage;
use dissent_core::config::SlotIntegrity;
use dissent_core::testing::run_bulk_scenario_happy_path;

fn main() {
    const NUM_SERVERS: usize = 2;
    const NUM_CLIENTS: usize = 3;
    const PAYLOAD_LEN: usize = 16;
    const VICTIM: usize = 1;

    let mut result =
        run_bulk_scenario_happy_path(NUM_SERVERS, NUM_CLIENTS, 1, PAYLOAD_LEN, |client_idx, _phase| vec![client_idx as u8; PAYLOAD_LEN]);

    let bitfield_bytes = NUM_CLIENTS.div_ceil(8);
    let slot_len = 32 + 13 + PAYLOAD_LEN + 64;
    let victim_offset = bitfield_bytes + VICTIM * slot_len;

    let before = SlotMessage::derandomize_and_verify(
        &result.cleartexts[0][victim_offset..victim_offset + slot_len],
        SlotIntegrity::Signed,
        Some(&result.anonymous_verifying_keys[VICTIM]),
    );
    assert!(before.is_some(), "an honest slot must verify before any tampering");

    result.cleartexts[0][victim_offset] ^= 0x01;

    let after = SlotMessage::derandomize_and_verify(
        &result.cleartexts[0][victim_offset..victim_offset + slot_len],
        SlotIntegrity::Signed,
        Some(&result.anonymous_verifying_keys[VICTIM]),
    );
    assert!(after.is_none(), "a single flipped bit must break the slot's signature");
    println!("client {VICTIM}'s slot was tampered with; signature check failed, blame would start");
}
