pub mod app;
pub mod backend;
pub mod errors;
pub mod logging;
pub mod session;
pub mod ui;
