//! Feedle DB - Record storage in PostgreSQL
//!
//! This crate implements [`feedle_core::RecordStore`] on top of `sqlx`.
//!
//! # Overview
//!
//! The main component is [`RecordRepository`], which stores normalized
//! records in the `fetched_data` table and answers the existence queries the
//! duplicate filter relies on. The schema lives in `migrations/` at the
//! workspace root.

mod repository;

pub use repository::RecordRepository;
