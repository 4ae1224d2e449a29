pub mod members;
pub mod sessions;
pub mod status;
