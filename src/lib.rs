pub mod clock;
pub mod traits;
pub mod status;
pub mod lock;
pub mod derived;
pub mod panel;
pub mod reconciler;
pub mod mode;
pub mod dispatcher;
pub mod request;
pub mod worker;
pub mod controller;
pub mod client;
pub mod config;
pub mod command;
pub mod packet;
