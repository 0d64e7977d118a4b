// src/handlers/mod.rs

pub mod auth;
pub mod catalog;
pub mod community;
pub mod interaction;
pub mod links;
pub mod pattern;
pub mod profile;
pub mod project;
