pub mod attendance;
pub mod employee;
pub mod geo;
pub mod qr_code;
pub mod report;
pub mod role;
