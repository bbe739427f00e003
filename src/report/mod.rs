pub mod export;
pub mod gauge;
pub mod summary;
