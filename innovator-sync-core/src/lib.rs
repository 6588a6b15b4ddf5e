#![doc = "innovator-sync-core: Aras Innovator client and CAD transfer pipeline."]

//! This crate holds the Innovator OData client (one API per item type), the
//! client-side field validation, the BOM reader with its item-number
//! classification, and the tag/transfer pipelines that move CAD metadata
//! from the document store into Innovator.
//!
//! # Usage
//! Log in with [`session::Session::login`], wrap the session in an
//! [`odata::ODataClient`] and hand it to the entity APIs. The pipelines only
//! depend on the traits in [`contract`].

pub mod airworthiness;
pub mod bom;
pub mod classify;
pub mod contract;
pub mod documents;
pub mod error;
pub mod files;
pub mod metadata;
pub mod odata;
pub mod parts;
pub mod session;
pub mod tagging;
pub mod transfer;
pub mod validate;
