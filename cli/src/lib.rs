pub mod command;
pub mod sqlitelist;
