//! Logprobe Core
//!
//! Core types for verifying that log records reached a remote log store.
//!
//! This crate contains:
//! - Domain types: categories, grouping strategies, groups, streams, requests and results
//! - DTOs: wire shapes of the CloudWatch Logs, Elasticsearch and Loki query APIs

pub mod domain;
pub mod dto;
