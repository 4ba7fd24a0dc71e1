//! Synthetic event generation.
//!
//! Events are generated deterministically from a seed so that runs with
//! different slot counts can be compared.

use common_error::FlowResult;
use rowflow_core::{DataType, Field, Schema, Value};
use rowflow_source::MemorySource;

/// Deterministic pseudo-random generator (SplitMix64).
#[derive(Debug, Clone)]
pub struct EventGenerator {
    state: u64,
}

impl EventGenerator {
    /// Create a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Exponentially distributed value with the given mean.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        -mean * (1.0 - self.uniform()).ln()
    }

    /// Integer in `[0, bound)`.
    pub fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            0
        } else {
            self.next_u64() % bound
        }
    }
}

/// Schema of the synthetic event table.
pub fn event_schema() -> Schema {
    Schema::new(
        "events",
        vec![
            Field::new("event", DataType::Int64),
            Field::new("n_jets", DataType::Int64),
            Field::new("jet_pt", DataType::Array(Box::new(DataType::Float64))),
            Field::new("met", DataType::Float64),
        ],
    )
}

/// `n` synthetic events: an event number, a jet multiplicity, the jet
/// transverse momenta and the missing transverse energy.
pub fn synthetic_events(n: usize, seed: u64) -> FlowResult<MemorySource> {
    let mut generator = EventGenerator::new(seed);
    let rows = (0..n)
        .map(|event| {
            let n_jets = generator.below(7);
            let jets: Vec<f64> = (0..n_jets).map(|_| 20.0 + generator.exponential(40.0)).collect();
            vec![
                Value::Int64(event as i64),
                Value::Int64(n_jets as i64),
                Value::from(jets),
                Value::Float64(generator.exponential(30.0)),
            ]
        })
        .collect();
    MemorySource::new(event_schema(), rows)
}
