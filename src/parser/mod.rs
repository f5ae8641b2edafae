pub mod product;
pub mod query;

pub use product::{ExtractionError, RawProduct, extract_product, extract_value};
pub use query::{QueryKey, normalize_query, query_key};
