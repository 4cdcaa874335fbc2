//! Distributed leader lock

mod leader_lock;

pub use leader_lock::RedisLeaderLock;
