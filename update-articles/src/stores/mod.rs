pub mod memory;
pub mod postgres;

pub use memory::MemoryArticleStore;
pub use postgres::PgArticleStore;
