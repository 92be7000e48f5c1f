pub mod catalog;
pub mod requirements;
