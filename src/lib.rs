//! Operational tooling for a deployed diamond: ABI extraction, production
//! facet selector audits, calldata patching and ABI/transaction inspection.
//! Each program under `src/bin` is a thin `main` over these modules.

pub mod account;
pub mod audit;
pub mod chain;
pub mod config;
pub mod extractor;
pub mod inspector;
pub mod patcher;
pub mod sources;
pub mod telemetry;
pub mod tuple;

pub use config::Config;
