pub mod artifacts;
pub mod batch;
pub mod profile;
pub mod trial;
