pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod csv;
pub mod sheets;
pub mod webhook;
