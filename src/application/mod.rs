// Application layer - engines, services and the server port
pub mod constraint_solver;
pub mod dashboard_builder;
pub mod dashboard_service;
pub mod display_session;
pub mod drag_resize;
pub mod panel_context;
pub mod preview;
pub mod reconciler;
pub mod rotation_service;
pub mod splitflap_api;
pub mod translation_service;
