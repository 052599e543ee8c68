//! Stage-1 crawl worker pool
//!
//! Each worker checks a session out of a shared [`ResourcePool`], then pulls
//! items from the [`Frontier`] until it hands out `None`, rendering each item
//! and forwarding the links it finds to a [`LinkSink`].

use crate::crawler::frontier::{ClaimedItem, Frontier};
use crate::crawler::item::CrawlItem;
use crate::crawler::pool::ResourcePool;
use crate::crawler::renderer::Renderer;
use crate::storage::LinkSink;
use crate::HarvestError;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Counters for a finished crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Items rendered successfully
    pub pages: usize,
    /// Items whose render failed
    pub failed: usize,
    /// Links handed to the sink
    pub links: usize,
    /// Links the sink refused
    pub dropped: usize,
    /// Links fed back into the frontier
    pub enqueued: usize,
}

impl std::ops::AddAssign for CrawlStats {
    fn add_assign(&mut self, other: Self) {
        self.pages += other.pages;
        self.failed += other.failed;
        self.links += other.links;
        self.dropped += other.dropped;
        self.enqueued += other.enqueued;
    }
}

/// Link-following settings for the workers
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowPolicy {
    /// Whether discovered links go back into the frontier
    pub enabled: bool,
    /// Items at this depth are rendered but not expanded further
    pub max_depth: u32,
}

impl FollowPolicy {
    fn should_follow(&self, item: &CrawlItem) -> bool {
        self.enabled && item.depth() < self.max_depth
    }
}

/// Fixed-size set of running crawl workers
pub struct WorkerPool {
    workers: Vec<JoinHandle<CrawlStats>>,
}

impl WorkerPool {
    /// Spawns `size` workers draining `frontier`
    ///
    /// Up to `size` renderer sessions exist at once; they are created on
    /// first checkout and reused after that.
    pub fn spawn<R: Renderer>(
        size: usize,
        frontier: Arc<Frontier>,
        renderer: Arc<R>,
        sink: Arc<dyn LinkSink>,
        follow: FollowPolicy,
    ) -> Self {
        let size = size.max(1);
        let sessions = {
            let renderer = Arc::clone(&renderer);
            Arc::new(ResourcePool::new(size, move || renderer.open_session()))
        };

        let workers = (0..size)
            .map(|id| {
                let worker = Worker {
                    id,
                    frontier: Arc::clone(&frontier),
                    renderer: Arc::clone(&renderer),
                    sessions: Arc::clone(&sessions),
                    sink: Arc::clone(&sink),
                    follow,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!("Started {} crawl workers", size);
        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Waits for every worker to exit and sums their counters
    ///
    /// Workers only exit once the frontier is closed and drained, so close
    /// it before (or while) awaiting this.
    pub async fn join(self) -> CrawlStats {
        let mut total = CrawlStats::default();
        for handle in self.workers {
            match handle.await {
                Ok(stats) => total += stats,
                Err(e) => tracing::error!("Crawl worker panicked: {}", e),
            }
        }
        total
    }
}

struct Worker<R: Renderer> {
    id: usize,
    frontier: Arc<Frontier>,
    renderer: Arc<R>,
    sessions: Arc<ResourcePool<R::Session, HarvestError>>,
    sink: Arc<dyn LinkSink>,
    follow: FollowPolicy,
}

impl<R: Renderer> Worker<R> {
    async fn run(self) -> CrawlStats {
        let mut stats = CrawlStats::default();

        // Returned to the pool when dropped, on every exit path
        let mut session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(worker = self.id, "Could not open renderer session: {}", e);
                return stats;
            }
        };

        tracing::debug!(worker = self.id, "Crawl worker started");

        // The claim is released at the end of each iteration, after any
        // follow-up items have been added
        while let Some(claimed) = self.frontier.next().await {
            self.process(&mut session, &claimed, &mut stats).await;
        }

        tracing::debug!(
            worker = self.id,
            pages = stats.pages,
            failed = stats.failed,
            "Crawl worker finished"
        );
        stats
    }

    async fn process(
        &self,
        session: &mut R::Session,
        claimed: &ClaimedItem,
        stats: &mut CrawlStats,
    ) {
        let item = claimed.item();
        tracing::debug!(worker = self.id, url = %item.url(), depth = item.depth(), "Rendering");

        let links = match self
            .renderer
            .render(session, item, claimed.politeness())
            .await
        {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(worker = self.id, url = %item.url(), "Render failed: {}", e);
                stats.failed += 1;
                return;
            }
        };
        stats.pages += 1;

        let follow = self.follow.should_follow(item);
        for link in links {
            if follow {
                match CrawlItem::new(&link, item.depth() + 1) {
                    Ok(next) => {
                        if self.frontier.add(next) {
                            stats.enqueued += 1;
                        }
                    }
                    Err(e) => tracing::debug!("Not following {}: {}", link, e),
                }
            }

            if self.sink.submit(link).await {
                stats.links += 1;
            } else {
                stats.dropped += 1;
            }
        }
    }
}
