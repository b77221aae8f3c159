//! Domain services for the reward bank: the append-only ledger, the daily
//! snapshot job, the weekly interest job, account directory and typed
//! configuration access.

pub mod accounts;
pub mod config;
pub mod interest;
pub mod ledger;
pub mod models;
pub mod snapshot;
