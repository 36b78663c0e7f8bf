pub mod model;
pub mod replicator;
