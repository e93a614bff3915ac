//! REST surface for pawmatch.
//!
//! - `POST /recommend` - recommendations for a free-text query
//! - `POST /feedback` - record a 1-5 rating for served recommendations
//! - `GET /stats` - corpus statistics
//! - `GET /health` - liveness

pub mod rest;

pub use rest::{AppState, RestApi};
