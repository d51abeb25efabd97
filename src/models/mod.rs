pub mod classify_types;
pub mod crop_types;
pub mod image_types;
