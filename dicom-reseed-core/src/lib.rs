#![doc = "dicom-reseed-core: core loop logic for dicom-reseed."]

//! This crate holds the run configuration, the uploader contract and the
//! sequential loop that re-invokes an external DICOM uploader.
//! Argument parsing and logging setup live in the `dicom-reseed` CLI crate.
//!
//! # Usage
//! Build a [`config::RunConfig`], pick an [`contract::Uploader`] (usually
//! [`uploader::ProcessUploader`]) and hand both to [`loop_runner::run_loops`].

pub mod config;
pub mod contract;
pub mod loop_runner;
pub mod uploader;
