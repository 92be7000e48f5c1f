pub mod assignment;
pub mod catalog_service;
pub mod lifecycle;
pub mod renewal;
pub mod urgency;
