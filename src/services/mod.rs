pub mod classifier;
pub mod crop_flow;
pub mod crop_service;
pub mod image_service;
pub mod session_store;
