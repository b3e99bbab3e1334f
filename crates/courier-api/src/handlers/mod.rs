//! Request handlers

pub mod auth;
pub mod chat;
pub mod health;
pub mod messages;
pub mod oauth;
pub mod users;
