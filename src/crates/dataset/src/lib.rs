pub mod generator;
pub mod loader;

pub use generator::{
    DataGenerator, GenerateError, GeneratedDataset, GenerationSummary, GeneratorConfig,
    PlantedPattern, Span,
};
pub use loader::{
    LoadError, Loaded, NODES_FILE, RecordError, SkippedRecord, TRANSACTIONS_FILE, parse_nodes,
    parse_transactions, read_nodes, read_transactions, write_nodes, write_transactions,
};
