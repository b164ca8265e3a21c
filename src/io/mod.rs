pub mod compression;
pub mod fs;
pub mod glob;
pub mod reader;
pub mod writer;
