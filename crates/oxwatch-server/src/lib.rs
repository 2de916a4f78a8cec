pub mod broker;
pub mod comments;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod object_builder;
pub mod passive;
pub mod period;
pub mod runner;
pub mod state;
pub mod timers;
