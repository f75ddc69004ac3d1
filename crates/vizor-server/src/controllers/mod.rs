//! HTTP controllers.

pub mod async_event_controller;
pub mod health_controller;
