// handlers/mod.rs - the six resource families.
//
// Every handler follows the same pipeline: identity from the gate, inputs
// from path/query/body, validation before any service call, delegation to
// one service trait, result shaped by ApiResponse/ApiError.

pub mod auth;
pub mod board;
pub mod chat;
pub mod message;
pub mod notification;
pub mod workspace;
