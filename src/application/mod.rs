// Application layer - Use cases and collaborator interfaces
pub mod animation_service;
pub mod catalog_client;
pub mod frame_exporter;
pub mod location_resolver;
