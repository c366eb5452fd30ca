pub mod account;
pub mod codec;
pub mod item;
pub mod key;
pub mod money;
pub mod ports;
