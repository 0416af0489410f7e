pub mod chart;
pub mod config;
pub mod controller;
pub mod helpers;
pub mod reconciler;
pub mod seed;
