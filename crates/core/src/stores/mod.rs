pub mod memory;
pub mod pinecone;
pub mod qdrant;

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use qdrant::QdrantIndex;
