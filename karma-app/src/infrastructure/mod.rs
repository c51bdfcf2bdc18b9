pub mod auth;
pub mod cache;
pub mod db;
pub mod memory;
pub mod security;
