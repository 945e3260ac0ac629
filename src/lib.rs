//! ClinicLane - A multi-tenant article CMS
//!
//! This library provides the core functionality for ClinicLane: scoped
//! article editing with translations, bulk import/export and a localized
//! public site.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
