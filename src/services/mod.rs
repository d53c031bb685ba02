//! Paste workflows and the collaborators they drive.

pub mod cookie;
pub mod delete;
pub mod keys;
pub mod renderer;
pub mod storage_service;
pub mod upload;
