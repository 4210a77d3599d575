//! Charging infrastructure hierarchy with electrical capacity validation.
//!
//! A [`domain::Group`] owns charge stations, a [`domain::ChargeStation`] owns
//! connectors, and the sum of every connector's max current under a group may
//! never exceed the group's rated capacity. The [`engine`] module holds the
//! pure validators and the [`engine::MutationCoordinator`] that applies
//! requests against a [`repo::HierarchyStore`].

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod repo;
pub mod telemetry;
