pub mod catalog;
pub mod requirements;
pub mod urgency;
