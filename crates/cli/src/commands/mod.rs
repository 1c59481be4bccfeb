pub mod chat;
pub mod config_cmd;
pub mod filter;
pub mod parse;
