pub mod batch;
pub mod describe;
pub mod metadata;
pub mod paths;
pub mod rename;
