pub mod dashboard;
pub mod dca;
pub mod error;
pub mod historical;
