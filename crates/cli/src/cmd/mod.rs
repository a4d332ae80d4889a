pub mod fetch;
pub mod import;
pub mod token;
