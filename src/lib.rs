//! NFL betting model terminal: schedule/odds/team-stat assembly, feature
//! tables in SQLite, three classifier families, and prediction front ends.

pub mod boost;
pub mod config;
pub mod dataset;
pub mod export;
pub mod features;
pub mod http_cache;
pub mod http_client;
pub mod logistic;
pub mod net;
pub mod predict;
pub mod provider;
pub mod teams;
pub mod train;
