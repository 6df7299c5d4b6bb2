//! Core types for GFX Studio.
//!
//! This module provides type-safe wrappers for the content of the site
//! document and the people who interact with it.

pub mod asset_pack;
pub mod order;
pub mod portfolio;
pub mod price;
pub mod rating;
pub mod review;
pub mod site;
pub mod status;
pub mod visitor;

pub use asset_pack::AssetPack;
pub use order::Order;
pub use portfolio::PortfolioItem;
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError};
pub use review::Review;
pub use site::{PartialSiteData, SiteData};
pub use status::OrderStatus;
pub use visitor::VisitorIdentity;
