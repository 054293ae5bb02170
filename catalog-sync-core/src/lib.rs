#![doc = "catalog-sync-core: core pipeline library for catalog-sync."]

//! This crate contains the whole list → fetch → serialize → publish pipeline,
//! its data model and error taxonomy. Binary glue (CLI parsing, YAML config,
//! building the production object store) lives in the `catalog-sync` crate.
//!
//! # Usage
//! Build a [`catalog::HttpCatalog`] and an [`publish::ObjectStorePublisher`],
//! then hand both to [`synchronise::run`] together with a [`config::SyncConfig`].

pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod publish;
pub mod serialize;
pub mod synchronise;
