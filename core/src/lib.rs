//! Behavioral risk-task library: the trial loops behind the card, balloon
//! and point-subtraction tasks, isolated from any display runtime.

pub mod agent;
pub mod bart_task;
pub mod clock;
pub mod config;
pub mod crcp_task;
pub mod engine;
pub mod error;
pub mod interface;
pub mod psap_task;
pub mod rng;
pub mod session;
pub mod store;
pub mod task;
pub mod trial;
pub mod types;
