pub mod deploy;
pub mod ping;
