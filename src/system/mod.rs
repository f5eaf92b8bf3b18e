pub mod shutdown;
pub mod signals;
