pub mod db;
pub mod milestones;
pub mod models;
pub mod progress;
pub mod quests;
pub mod rank;
pub mod seed;
pub mod service;
pub mod stall_import;
pub mod store;
