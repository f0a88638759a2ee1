pub mod hierarchy_service;

pub use hierarchy_service::HierarchyService;
