pub mod app;
pub mod appwrite;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod models;
pub mod tmdb;
pub mod utils;
pub mod view;
