pub mod ask;
pub mod config_cmd;
pub mod search;
pub mod setup;
