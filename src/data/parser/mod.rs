pub mod extraction;

pub use extraction::parse_extraction_reply;
