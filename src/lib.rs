//! Newsroom - RSS ingestion and news API
//!
//! Polls a configured set of RSS feeds concurrently, normalizes every item
//! into a post, stores the posts in SQLite and serves them over a JSON API.

pub mod config;
pub mod db;
pub mod normalizer;
pub mod poller;
pub mod routes;
pub mod rss;
pub mod storage;
pub mod supervisor;
