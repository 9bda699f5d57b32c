// Domain layer - pure value types
pub mod alphabet;
pub mod dashboard;
pub mod display_state;
pub mod error;
pub mod geometry;
pub mod routine;
pub mod translation;
