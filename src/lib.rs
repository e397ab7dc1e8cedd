pub mod config;
pub mod demo;
pub mod error;
pub mod net;
pub mod queue;
pub mod sim;

#[cfg(test)]
mod test;
