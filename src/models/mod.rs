//! Core data models for the paste service.
//!
//! A paste is never persisted as one record: it is the pair of stored objects
//! described by [`object::StoredObject`], tied together by the keys in
//! [`paste::PasteKeys`] and the delete secret in [`metadata::ObjectMetadata`].

pub mod metadata;
pub mod object;
pub mod paste;
