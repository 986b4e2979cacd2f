//! Bus arbiter tests.
//!
//! Verifies fixed-priority and round-robin selection, grant holding, protocol violations,
//! and that every grant produces at most one completion.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use socfabric_core::common::{BusError, Completion, ProtocolViolation, Transaction};
use socfabric_core::config::ArbitrationPolicy;
use socfabric_core::soc::arbiter::BusArbiter;

fn fixed(masters: usize) -> BusArbiter {
    BusArbiter::new(masters, ArbitrationPolicy::FixedPriority)
}

// ══════════════════════════════════════════════════════════
// 1. Selection
// ══════════════════════════════════════════════════════════

#[test]
fn fixed_priority_lowest_index_wins() {
    let mut arbiter = fixed(3);
    arbiter.submit(2, Transaction::read(0x20)).unwrap();
    arbiter.submit(0, Transaction::read(0x10)).unwrap();

    let (master, txn) = arbiter.poll().unwrap();
    assert_eq!(master, 0);
    assert_eq!(txn.address, 0x10);
}

#[test]
fn second_master_granted_only_after_first_completes() {
    let mut arbiter = fixed(2);
    arbiter.submit(0, Transaction::read(1)).unwrap();
    arbiter.submit(1, Transaction::read(2)).unwrap();

    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(0));
    // No completion yet: the grant is held.
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(0));
    assert!(arbiter.is_pending(1));

    assert_eq!(arbiter.complete(Completion::Ack { data: 5 }), Ok(0));
    assert_eq!(arbiter.grant(), None);
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(1));
    assert_eq!(arbiter.take_response(0), Some(Completion::Ack { data: 5 }));
    assert_eq!(arbiter.take_response(1), None);
}

#[test]
fn round_robin_starts_after_last_grant() {
    let mut arbiter = BusArbiter::new(3, ArbitrationPolicy::RoundRobin);
    arbiter.submit(1, Transaction::read(0)).unwrap();
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(1));
    arbiter.complete(Completion::Ack { data: 0 }).unwrap();

    arbiter.submit(0, Transaction::read(0)).unwrap();
    arbiter.submit(1, Transaction::read(0)).unwrap();
    // Search starts at 2 (idle), wraps to 0.
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(0));
}

#[test]
fn fixed_priority_can_starve_lower_masters() {
    let mut arbiter = fixed(2);
    arbiter.submit(1, Transaction::read(0)).unwrap();
    for _ in 0..3 {
        arbiter.submit(0, Transaction::read(0)).unwrap();
        assert_eq!(arbiter.poll().map(|(m, _)| m), Some(0));
        arbiter.complete(Completion::Ack { data: 0 }).unwrap();
    }
    assert!(arbiter.is_pending(1));
}

// ══════════════════════════════════════════════════════════
// 2. Protocol violations
// ══════════════════════════════════════════════════════════

#[test]
fn resubmit_while_granted_is_rejected() {
    let mut arbiter = fixed(2);
    arbiter.submit(0, Transaction::read(1)).unwrap();
    let _ = arbiter.poll();

    assert_eq!(
        arbiter.submit(0, Transaction::write(2, 0xAA)),
        Err(ProtocolViolation::ResubmitWhileGranted(0))
    );
    // The original request is untouched.
    assert_eq!(arbiter.poll().map(|(_, txn)| txn.address), Some(1));
}

#[test]
fn resubmit_while_pending_is_rejected() {
    let mut arbiter = fixed(2);
    arbiter.submit(1, Transaction::read(1)).unwrap();
    assert_eq!(
        arbiter.submit(1, Transaction::read(2)),
        Err(ProtocolViolation::AlreadyPending(1))
    );
}

#[test]
fn unknown_master_and_malformed_transactions_are_rejected() {
    let mut arbiter = fixed(2);
    assert_eq!(
        arbiter.submit(5, Transaction::read(0)),
        Err(ProtocolViolation::UnknownMaster(5))
    );

    let strobe_without_cycle = Transaction {
        active: false,
        ..Transaction::read(0)
    };
    assert_eq!(
        arbiter.submit(0, strobe_without_cycle),
        Err(ProtocolViolation::Malformed)
    );
    assert_eq!(
        arbiter.submit(0, Transaction::idle()),
        Err(ProtocolViolation::Malformed)
    );
    assert!(!arbiter.is_pending(0));
}

#[test]
fn completion_without_grant_is_rejected() {
    let mut arbiter = fixed(1);
    assert_eq!(
        arbiter.complete(Completion::Ack { data: 0 }),
        Err(ProtocolViolation::NoGrant)
    );
}

// ══════════════════════════════════════════════════════════
// 3. Withdrawal
// ══════════════════════════════════════════════════════════

#[test]
fn withdrawn_incumbent_never_receives_its_completion() {
    let mut arbiter = fixed(2);
    arbiter.submit(0, Transaction::read(1)).unwrap();
    let _ = arbiter.poll();
    arbiter.withdraw(0);

    assert_eq!(
        arbiter.complete(Completion::Error(BusError::Unmapped(1))),
        Err(ProtocolViolation::NoGrant)
    );
    assert_eq!(arbiter.grant(), None);
    assert_eq!(arbiter.take_response(0), None);

    // A fresh transaction from the same master gets only its own completion.
    arbiter.submit(0, Transaction::read(2)).unwrap();
    let _ = arbiter.poll();
    arbiter.complete(Completion::Ack { data: 9 }).unwrap();
    assert_eq!(arbiter.take_response(0), Some(Completion::Ack { data: 9 }));
}

#[test]
fn withdrawn_incumbent_is_replaced_at_next_poll() {
    let mut arbiter = fixed(2);
    arbiter.submit(0, Transaction::read(1)).unwrap();
    arbiter.submit(1, Transaction::read(2)).unwrap();
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(0));

    arbiter.withdraw(0);
    assert_eq!(arbiter.poll().map(|(m, _)| m), Some(1));
}

// ══════════════════════════════════════════════════════════
// 4. Properties
// ══════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
enum Op {
    Submit(usize),
    Withdraw(usize),
    Poll,
    Complete,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3).prop_map(Op::Submit),
        (0usize..3).prop_map(Op::Withdraw),
        Just(Op::Poll),
        Just(Op::Complete),
    ]
}

proptest! {
    #[test]
    fn every_completion_goes_to_the_live_grant_exactly_once(ops in prop::collection::vec(op(), 1..96)) {
        let mut arbiter = fixed(3);
        let mut accepted = [0u32; 3];
        let mut delivered = [0u32; 3];

        for op in ops {
            match op {
                Op::Submit(m) => {
                    if arbiter.submit(m, Transaction::read(m as u32)).is_ok() {
                        accepted[m] += 1;
                    }
                }
                Op::Withdraw(m) => arbiter.withdraw(m),
                Op::Poll => {
                    if let Some((m, _)) = arbiter.poll() {
                        prop_assert!(arbiter.is_pending(m));
                    }
                }
                Op::Complete => {
                    let granted = arbiter.grant();
                    if let Ok(m) = arbiter.complete(Completion::Ack { data: 0 }) {
                        prop_assert_eq!(Some(m), granted);
                        prop_assert!(arbiter.take_response(m).is_some());
                        prop_assert!(arbiter.take_response(m).is_none());
                        delivered[m] += 1;
                    }
                    prop_assert_eq!(arbiter.grant(), None);
                }
            }
            for m in 0..3 {
                prop_assert!(delivered[m] <= accepted[m]);
            }
        }
    }
}
