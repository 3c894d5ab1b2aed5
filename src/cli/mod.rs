pub mod setup;
pub mod signal;
pub mod ui;
