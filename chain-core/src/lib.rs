pub mod mempack;
pub mod property;
