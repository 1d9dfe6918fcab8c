pub mod app_config;
pub mod redis_repo;
pub mod seed;

pub use redis_repo::RedisTicketRegistry;
pub use seed::{load_seed_file, seed_registry, SeedError, SeedSummary};
