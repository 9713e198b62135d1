pub mod acceptance;
pub mod admin;
pub mod compatibility;
pub mod engine;
pub mod error;
pub mod location;
pub mod messages;
pub mod notifier;
pub mod ranker;
pub mod session;
pub mod store;
pub mod support;

pub use acceptance::Outcome;
pub use admin::{AdminPolicy, CommitPolicy};
pub use engine::{Engine, EngineConfig, Registration, Submission};
pub use error::EngineError;
