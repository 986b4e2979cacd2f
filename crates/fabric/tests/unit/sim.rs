//! Simulator and scripted-master tests.

use crate::common::harness::{compose, fast_config, full_config};
use pretty_assertions::assert_eq;
use socfabric_core::common::Completion;
use socfabric_core::sim::{DebugOp, DebugRequester, Simulator, TrafficMaster, TrafficOp};

const RAM: u64 = 0x4000_0000;

#[test]
fn sequential_masters_read_back_their_writes() {
    let (soc, ids) = compose(&fast_config(), &["cpu", "dma"]);
    let words = 32;
    let mut sim = Simulator::new(soc);
    sim.add_master(TrafficMaster::sequential(ids[0], RAM, words, 1));
    sim.add_master(TrafficMaster::sequential(ids[1], RAM + 0x1_0000, words, 2));

    let summary = sim.run(100_000);
    assert!(summary.finished);
    assert_eq!(summary.mismatches, 0);
    assert_eq!(summary.rejected, 0);
    assert_eq!(sim.stats().acks, u64::from(2 * 2 * words));
    assert!(sim.masters().iter().all(|m| m.completed().len() == 2 * words as usize));
}

#[test]
fn wrong_expectation_is_counted() {
    let (soc, ids) = compose(&fast_config(), &["cpu"]);
    let mut sim = Simulator::new(soc);
    sim.add_master(TrafficMaster::new(
        ids[0],
        [
            TrafficOp::Write { address: RAM, data: 5 },
            TrafficOp::Read { address: RAM, expect: Some(6) },
        ],
    ));
    let summary = sim.run(1_000);
    assert!(summary.finished);
    assert_eq!(summary.mismatches, 1);
}

#[test]
fn idle_gap_delays_the_next_request() {
    let (soc, ids) = compose(&fast_config(), &["cpu"]);
    let mut sim = Simulator::new(soc);
    sim.add_master(TrafficMaster::new(
        ids[0],
        [TrafficOp::Idle(10), TrafficOp::Read { address: RAM, expect: Some(0) }],
    ));
    for _ in 0..10 {
        sim.tick();
        assert_eq!(sim.soc().stats().grants, 0);
    }
    let summary = sim.run(1_000);
    assert!(summary.finished);
    assert_eq!(
        sim.masters()[0].completed().last().map(|(_, c)| *c),
        Some(Completion::Ack { data: 0 })
    );
}

#[test]
fn debug_script_is_acknowledged_in_order() {
    let config = full_config();
    let window = config.mem_map.debug;
    let (soc, _) = compose(&config, &["cpu"]);
    let mut sim = Simulator::new(soc);
    sim.set_debug_requester(DebugRequester::new(
        window,
        [
            DebugOp::Write { offset: 0x04, data: 0xCAFE_F00D },
            DebugOp::Refresh { selector: 0x04 },
            DebugOp::Read { offset: 0x04 },
            DebugOp::Refresh { selector: 0x33 },
        ],
    ));

    let summary = sim.run(1_000);
    assert!(summary.finished);
    let acks = sim.debug_requester().map(|d| d.acks().to_vec()).unwrap_or_default();
    assert_eq!(acks.len(), 4);
    assert_eq!(acks[2], (DebugOp::Read { offset: 0x04 }, 0xCAFE_F00D));

    let capture = sim.soc().debug_bridge().map(|b| b.capture());
    assert_eq!(capture.map(|c| (c.a, c.b)), Some((0xFEED_BEEF, 0x33)));
    assert_eq!(sim.stats().debug_handshakes, 4);
    assert_eq!(sim.stats().debug_violations, 0);
}
