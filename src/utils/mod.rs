pub mod qr_registry;
