use proptest::prelude::*;

/// One step of a random engine workload. Indices are taken modulo the number
/// of drivers or rides that exist when the step runs.
#[derive(Debug, Clone)]
pub enum EngineOp {
    RegisterDriver,
    GoOnline(usize),
    GoOffline(usize),
    Heartbeat(usize),
    Book(i64),
    ListAvailable,
    /// Move the wall clock used for liveness
    AdvanceClock(i64),
    /// Let trip timers run
    AdvanceTime(u64),
    CompleteRide(usize),
}

pub fn engine_op_strategy() -> impl Strategy<Value = EngineOp> {
    prop_oneof![
        2 => Just(EngineOp::RegisterDriver),
        3 => (0usize..8).prop_map(EngineOp::GoOnline),
        1 => (0usize..8).prop_map(EngineOp::GoOffline),
        1 => (0usize..8).prop_map(EngineOp::Heartbeat),
        4 => (1i64..=5).prop_map(EngineOp::Book),
        1 => Just(EngineOp::ListAvailable),
        1 => (1i64..=15).prop_map(EngineOp::AdvanceClock),
        2 => (1u64..=90).prop_map(EngineOp::AdvanceTime),
        1 => (0usize..16).prop_map(EngineOp::CompleteRide),
    ]
}

pub fn engine_ops_strategy() -> impl Strategy<Value = Vec<EngineOp>> {
    prop::collection::vec(engine_op_strategy(), 1..40)
}
