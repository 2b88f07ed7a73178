mod token_store_file;

pub use token_store_file::*;
