//! Technify - a small personal blog
//!
//! This library provides the core functionality of the blog: paginated post
//! listing, single post pages, a contact form that emails the site owner, and
//! a single-admin area for writing posts.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
