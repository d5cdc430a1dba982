pub mod sht3x;
