pub mod bluetooth;
pub mod link;
pub mod logging;
