pub mod search;
pub use search::{SearchError, SearchService};

pub mod sweeper;
pub use sweeper::CacheSweeper;

pub mod system_service;
pub mod system_service_impl;
pub use system_service::{SystemError, SystemService};
pub use system_service_impl::SeaOrmSystemService;
