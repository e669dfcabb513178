//! # launchpad-site
//!
//! Site-document reconciliation for launchpad-style tile collections.
//!
//! ## Overview
//!
//! A launchpad site is a JSON document (the "Common Data Model" layout) holding ordered groups of
//! tiles and links plus reference tables (visualizations, visualization types, applications with
//! their inbounds) needed to turn a tile into something displayable. This crate keeps that
//! document in memory, applies personalization edits to it, resolves tiles to display
//! descriptors, and finds bookmarks by target.
//!
//! ### Key Features
//!
//! - **Load coalescing**: concurrent loads share one backend fetch ([`store::SiteStore`])
//! - **Validating mutators**: group and tile edits either apply completely or not at all ([`mutators`])
//! - **Resolution cache**: each tile is resolved once, concurrent requests share the pending result ([`resolver`])
//! - **Bookmark matching**: order-independent intent comparison with viz type / content provider filters ([`bookmarks`])
//! - **Patch events**: every persisted edit is described by a [`event::SiteEvent`]
//!
//! ## Architecture
//!
//! - **[`site`]**: document model (`Site`, `Group`, `Tile`, `Visualization`, `Application`, ...)
//! - **[`hash`]**: intent hashes (`#SemanticObject-action?p=v&/route`)
//! - **[`service`]**: collaborator traits (`SiteService`, `ResolutionService`, `IdGenerator`, `TileComponent`)
//! - **[`adapter`]**: [`adapter::SiteAdapter`] composes all of the above
//! - **[`commands`]**: `Op`/`OpResult` request surface for hosts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use launchpad_site::{
//!     adapter::SiteAdapter,
//!     bookmarks::BookmarkQuery,
//!     config::AdapterConfig,
//!     service::{JsonFileSiteService, LocalResolutionService},
//! };
//! use std::{path::PathBuf, sync::Arc};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = SiteAdapter::new(
//!         Arc::new(JsonFileSiteService::new(PathBuf::from("./site.json"))),
//!         Arc::new(LocalResolutionService::new()),
//!         AdapterConfig::default(),
//!     );
//!
//!     for group in adapter.get_groups().await {
//!         println!("{}: {}", group.id(), group.title());
//!         for tile in adapter.get_group_tiles(group.id()).await? {
//!             println!("  {} -> {}", tile.title, tile.tile_intent);
//!         }
//!     }
//!
//!     let count = adapter
//!         .count_bookmarks(&BookmarkQuery::new("#SO-action").with_content_provider("S4SYSTEM"))
//!         .await?;
//!     println!("{count} bookmarks");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `site-inspect` command line tool

pub mod adapter;
pub mod bookmarks;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod hash;
pub mod mutators;
pub mod resolver;
pub mod service;
pub mod site;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
