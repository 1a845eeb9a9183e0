//! Key embeddings: the vector table and the concurrent fetcher.

mod fetch;
mod table;

pub use fetch::{fetch_embeddings, FailedKey, FetchConfig, FetchOutcome};
pub use table::{AlignedEmbeddings, EmbeddingTable, KeyEmbedding};
