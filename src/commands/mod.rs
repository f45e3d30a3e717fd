pub mod app;
pub mod release;
