// src/utils/mod.rs

pub mod cache;
pub mod category_tree;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod notifier;
