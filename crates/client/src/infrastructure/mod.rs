pub mod clock;
pub mod ports;
pub mod testing;
