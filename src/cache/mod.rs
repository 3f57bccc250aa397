pub mod graph_cache;

pub use graph_cache::GraphCache;
