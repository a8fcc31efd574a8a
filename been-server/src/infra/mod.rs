pub mod app_state;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod startup;
