//! Crawler module for stage 1 (URL discovery)
//!
//! This module contains the core crawling logic, including:
//! - The priority frontier with per-domain politeness
//! - The bounded pool of renderer sessions
//! - Rendering, content expansion and link extraction
//! - The worker pool and overall crawl coordination

mod coordinator;
mod frontier;
mod item;
mod politeness;
mod pool;
mod renderer;
mod scroll;
mod seeds;
mod worker;

pub use coordinator::{run_crawl, Coordinator};
pub use frontier::{ClaimedItem, Frontier};
pub use item::CrawlItem;
pub use politeness::{wait_turn, DomainPolicy, PolitenessRegistry};
pub use pool::{PooledResource, ResourcePool};
pub use renderer::{extract_links, page_url, HttpRenderer, HttpSession, Renderer};
pub use scroll::{expand_until_stable, Expandable, ExpansionOutcome};
pub use seeds::{CategorySeeds, SeedSource};
pub use worker::{CrawlStats, FollowPolicy, WorkerPool};
