//! Data models for documents, classification policy, and bank movements.

pub mod document;
pub mod movement;
pub mod policy;
