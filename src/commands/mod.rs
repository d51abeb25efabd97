pub mod classifier;
pub mod crop;
pub mod image;
pub mod session;
