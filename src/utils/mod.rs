pub mod bitreader;
pub mod error;
pub mod info;
pub mod logger;
pub mod marker;
