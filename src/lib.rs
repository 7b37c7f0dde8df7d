//! Foodgram - a recipe sharing backend
//!
//! This library provides the core functionality for the Foodgram API:
//! recipes with ingredients and tags, favorites, shopping carts,
//! subscriptions and the aggregated shopping list export.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
