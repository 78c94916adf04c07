pub mod api;
pub mod broker;
pub mod config;
pub mod control;
pub mod db;
pub mod fusion;
pub mod persistence;
pub mod sensors;
