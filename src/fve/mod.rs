pub mod boot;
pub mod entry;
pub mod header;
pub mod parser;
pub mod reader;
pub mod records;
pub mod utils;

#[cfg(test)]
pub mod fixtures;
