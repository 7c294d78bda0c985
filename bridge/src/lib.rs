pub mod actions;
pub mod aem;
pub mod auth;
pub mod brand_manager;
pub mod event_hub;
pub mod event_manager;
pub mod file_store;
pub mod params;
pub mod server;
pub mod storage;
