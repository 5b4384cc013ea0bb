pub use aml_dataset as dataset;
pub use aml_heuristics as heuristics;
pub use aml_pipeline as pipeline;
pub use aml_primitives as primitives;
pub use aml_storage as storage;
