pub mod type_system;
pub mod types;
