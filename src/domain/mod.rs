// Domain layer - Pure types and selection rules
pub mod location;
pub mod region;
pub mod scene;
pub mod selection;
pub mod visualization;
