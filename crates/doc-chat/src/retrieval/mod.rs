//! Retrieval: partitioned similarity search and the query pipeline

mod query;
mod search;

pub use query::QueryPipeline;
pub use search::{partition_key, RetrievalStore};
