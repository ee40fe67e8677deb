#![doc = "skillsync-core: resolution, reconciliation and materialization engine for skillsync."]

//! This crate holds every data model and engine of skillsync. The CLI crate
//! only parses arguments, loads the config and prints reports.
//!
//! # Pipeline
//! [`config`] → [`reconcile`] → [`resolve`] + [`download`] → [`materialize`],
//! wired together by [`synchronise`]. Collaborators sit behind the traits in
//! [`contract`].

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod contract;
pub mod detect;
pub mod diagnostics;
pub mod download;
pub mod error;
pub mod materialize;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod synchronise;
