// Presentation layer - local JSON API over the engines
pub mod app_state;
pub mod handlers;
