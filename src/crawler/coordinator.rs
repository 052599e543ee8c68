//! Crawler coordinator - stage-1 orchestration
//!
//! Wires the seed source, frontier, worker pool and URL writer together and
//! owns the shutdown order: seed, close the frontier, join the workers, then
//! close the writer so every discovered URL is flushed.

use crate::config::Config;
use crate::crawler::frontier::Frontier;
use crate::crawler::renderer::{HttpRenderer, Renderer};
use crate::crawler::seeds::{CategorySeeds, SeedSource};
use crate::crawler::worker::{CrawlStats, FollowPolicy, WorkerPool};
use crate::storage::{LinkSink, UrlWriter};
use crate::HarvestError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;

/// Main crawler coordinator structure
pub struct Coordinator<R: Renderer> {
    config: Arc<Config>,
    frontier: Arc<Frontier>,
    renderer: Arc<R>,
}

impl<R: Renderer> Coordinator<R> {
    /// Creates a coordinator with an empty frontier
    pub fn new(config: Config, renderer: R) -> Self {
        let frontier = Arc::new(Frontier::new(config.crawler.politeness_delay()));
        Self {
            config: Arc::new(config),
            frontier,
            renderer: Arc::new(renderer),
        }
    }

    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// Runs the crawl to completion
    ///
    /// Seeds are loaded and queued before any worker starts; the frontier is
    /// closed as soon as the workers are running, so they exit once the
    /// queue is drained and no worker can add followed links any more.
    pub async fn run(
        &self,
        seeds: &dyn SeedSource,
        sink: Arc<dyn LinkSink>,
    ) -> Result<CrawlStats, HarvestError> {
        let start_time = Instant::now();

        let items = seeds.seeds().await?;
        let queued = items
            .into_iter()
            .filter_map(|item| self.frontier.add(item).then_some(()))
            .count();
        tracing::info!("Queued {} seeds", queued);

        let crawler = &self.config.crawler;
        let pool = WorkerPool::spawn(
            crawler.workers,
            Arc::clone(&self.frontier),
            Arc::clone(&self.renderer),
            sink,
            FollowPolicy {
                enabled: crawler.follow_links,
                max_depth: crawler.max_depth,
            },
        );

        self.frontier.close();
        let stats = pool.join().await;

        tracing::info!(
            "Crawl completed: {} pages rendered, {} failed, {} links recorded in {:?}",
            stats.pages,
            stats.failed,
            stats.links,
            start_time.elapsed()
        );
        tracing::debug!(
            "Frontier saw {} URLs across {} domains",
            self.frontier.seen_count(),
            self.frontier.domain_count()
        );

        Ok(stats)
    }
}

/// Builds the client used for seed discovery
fn build_seed_client(config: &Config) -> Result<Client, HarvestError> {
    Ok(Client::builder()
        .timeout(config.crawler.request_timeout())
        .gzip(true)
        .brotli(true)
        .build()?)
}

/// Runs a complete stage-1 crawl with the HTTP renderer
///
/// This is the main entry point for stage 1. It will:
/// 1. Open the URL list for appending (a failure here aborts the run)
/// 2. Discover the seeds
/// 3. Crawl until the frontier is drained
/// 4. Flush and close the URL list
pub async fn run_crawl(config: Config) -> Result<CrawlStats, HarvestError> {
    let writer = UrlWriter::open(&config.writer.url_list_path, &config.writer).await?;

    let seeds = CategorySeeds::new(build_seed_client(&config)?, &config.seed)?;
    let renderer = HttpRenderer::new(&config.crawler)?;
    let coordinator = Coordinator::new(config, renderer);

    let result = coordinator.run(&seeds, Arc::new(writer.handle())).await;

    // Close even when seeding failed so the file is released cleanly
    let written = writer.close().await?;
    let stats = result?;

    if written.written != stats.links {
        tracing::warn!(
            "{} links submitted but {} written",
            stats.links,
            written.written
        );
    }

    Ok(stats)
}
