pub mod check;
pub mod config;
pub mod repair;
pub mod run;
