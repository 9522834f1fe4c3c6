// src/lib.rs

pub mod auth;
pub mod bot;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod eventbus;
pub mod irc;
pub mod plugins;
pub mod utils;

pub use alaris_common::error::Error;
pub use bot::AlarisBot;
pub use config::BotConfig;
