//! Estate Desk - Multi-Agent Real Estate Concierge
//!
//! This crate implements a conversational backend where role-specialized
//! agents drive a generative language model to produce fictional real-estate
//! guidance: property search, amenities research, negotiation strategy,
//! legal review, lifestyle fit, location analysis, and closing steps.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
