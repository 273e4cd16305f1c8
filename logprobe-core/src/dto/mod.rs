//! Data Transfer Objects for backend query APIs
//!
//! Wire shapes of the requests and responses exchanged with CloudWatch Logs,
//! Elasticsearch and Loki. DTOs stay close to the JSON each backend speaks;
//! the clients convert them into domain types.

pub mod cloudwatch;
pub mod elasticsearch;
pub mod loki;
