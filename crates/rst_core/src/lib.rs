pub mod checksum;
pub mod core_api;
pub mod diagnostics;
pub mod document;
pub mod game;
pub mod layout;
pub mod reader;
pub mod rst;
pub mod shiplist;
pub mod spec_table;
pub mod util_dat;
pub mod writer;
