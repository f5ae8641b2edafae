pub mod product;
pub mod search;

pub use product::{ProductAttributes, ProductRecord};
pub use search::{CacheEntry, SearchResponse};
