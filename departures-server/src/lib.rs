//! Departure aggregation server.
//!
//! Fetches live departures for every configured station once per cycle,
//! shares them between any number of dashboard routes, groups each stop's
//! departures into labelled directions, and pushes the resulting views to
//! connected viewers.

pub mod broadcast;
pub mod cache;
pub mod config;
pub mod domain;
pub mod feed;
pub mod grouping;
pub mod lifecycle;
pub mod poller;
pub mod scheduler;
pub mod web;
