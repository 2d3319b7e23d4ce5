pub mod attendance;
pub mod qr_code;
pub mod report;
