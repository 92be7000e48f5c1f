pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod requirements_repo;
pub use requirements_repo::RequirementsRepository;
