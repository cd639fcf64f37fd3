pub mod camera;
pub mod clock;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod storage;
pub mod streaming;
pub mod web_interface;

pub use controller::Controller;
