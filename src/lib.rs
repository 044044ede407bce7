pub mod api;
pub mod config;
pub mod confirm;
pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod manage_accounts;
pub mod manage_businesses;
pub mod manage_freelancers;
pub mod manage_transactions;
pub mod manage_verifications;
pub mod merge_table;
pub mod payload;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod sources;
pub mod views;
