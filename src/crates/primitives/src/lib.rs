pub mod config;
pub mod graph;
pub mod graph_index;
pub mod ids;
pub mod transaction;

pub use config::{ConfigError, DetectionConfig, TimeDifferenceMode};
pub use graph::{Account, Edge, EdgeUpdate, GraphError, TransactionGraph};
pub use graph_index::{Direction, Neighborhood, NeighborhoodIndex};
pub use ids::{AccountId, EdgeId, TransactionId};
pub use transaction::{DensePair, EXACT_MATCH_WEIGHT, Group, MatchedPair, Transaction, difference};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use crate::transaction::Transaction;

    /// A laundering ring shaped like the generated datasets: `sender` pays every
    /// intermediate `input_amount` at time 1, and each intermediate forwards
    /// `output_amount` to `receiver` at time 2. Every hop is repeated `repeats`
    /// times. Ids start at `first_id` and increase by one per transaction.
    #[derive(Debug, Clone)]
    pub struct RingFixture {
        pub sender: u64,
        pub receiver: u64,
        pub intermediates: Vec<u64>,
        pub repeats: u32,
        pub input_amount: i64,
        pub output_amount: i64,
    }

    impl RingFixture {
        pub fn new(sender: u64, receiver: u64, intermediates: Vec<u64>) -> Self {
            Self {
                sender,
                receiver,
                intermediates,
                repeats: 1,
                input_amount: 10_000,
                output_amount: 9_900,
            }
        }

        pub fn repeats(mut self, repeats: u32) -> Self {
            self.repeats = repeats;
            self
        }

        /// Lead and follow transactions are interleaved, lead first.
        pub fn transactions(&self, first_id: u64) -> Vec<Transaction> {
            let mut next_id = first_id;
            let mut out = Vec::new();
            for &hop in &self.intermediates {
                for _ in 0..self.repeats {
                    out.push(Transaction::new(
                        next_id,
                        self.sender,
                        hop,
                        self.input_amount,
                        1,
                    ));
                    out.push(Transaction::new(
                        next_id + 1,
                        hop,
                        self.receiver,
                        self.output_amount,
                        2,
                    ));
                    next_id += 2;
                }
            }
            out
        }
    }

    /// `T1 = (1, A=10, B=20, 10000, t=1)`, `T2 = (2, B=20, C=30, 9950, t=2)`.
    pub fn single_hop() -> Vec<Transaction> {
        vec![
            Transaction::new(1, 10, 20, 10_000, 1),
            Transaction::new(2, 20, 30, 9_950, 2),
        ]
    }
}
