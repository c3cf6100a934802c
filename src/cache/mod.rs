pub mod invalidation;
pub mod query_cache;
