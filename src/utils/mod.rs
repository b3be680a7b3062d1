pub mod ip;
pub mod periodic;

pub use periodic::PeriodicTask;
