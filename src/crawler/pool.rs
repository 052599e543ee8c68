//! Bounded pool of reusable, heavyweight resources
//!
//! Checkouts are scoped: a [`PooledResource`] hands its value back to the pool
//! when dropped, on every exit path.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type Factory<T, E> = dyn Fn() -> Result<T, E> + Send + Sync;

struct Shared<T> {
    idle: Mutex<Vec<T>>,
}

impl<T> Shared<T> {
    fn take_idle(&self) -> Option<T> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    fn put_back(&self, resource: T) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resource);
    }
}

/// A pool that creates resources on demand, up to `capacity` at once
pub struct ResourcePool<T, E> {
    shared: Arc<Shared<T>>,
    permits: Arc<Semaphore>,
    factory: Box<Factory<T, E>>,
    capacity: usize,
}

impl<T, E> ResourcePool<T, E>
where
    T: Send + 'static,
{
    /// Creates a pool allowing at most `capacity` simultaneous checkouts
    pub fn new<F>(capacity: usize, factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::with_capacity(capacity)),
            }),
            permits: Arc::new(Semaphore::new(capacity)),
            factory: Box::new(factory),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resources currently checked in
    pub fn idle_count(&self) -> usize {
        self.shared
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks out a resource, waiting while all of them are in use
    ///
    /// An idle resource is reused when available; otherwise a new one is
    /// built with the factory. A factory error releases the slot.
    pub async fn acquire(&self) -> Result<PooledResource<T>, E> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("resource pool semaphore is never closed"));

        let resource = match self.shared.take_idle() {
            Some(resource) => resource,
            None => (self.factory)()?,
        };

        Ok(PooledResource {
            resource: Some(resource),
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Drains and returns the idle resources, e.g. to shut them down
    pub fn drain_idle(&self) -> Vec<T> {
        std::mem::take(&mut *self.shared.idle.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A checked-out resource; dropping it returns the resource to its pool
pub struct PooledResource<T> {
    resource: Option<T>,
    shared: Arc<Shared<T>>,
    _permit: OwnedSemaphorePermit,
}

impl<T> Deref for PooledResource<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource
            .as_ref()
            .unwrap_or_else(|| unreachable!("resource is present until drop"))
    }
}

impl<T> DerefMut for PooledResource<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource
            .as_mut()
            .unwrap_or_else(|| unreachable!("resource is present until drop"))
    }
}

impl<T> Drop for PooledResource<T> {
    fn drop(&mut self) {
        // Resource goes back before the permit is released (field drop order)
        if let Some(resource) = self.resource.take() {
            self.shared.put_back(resource);
        }
    }
}
