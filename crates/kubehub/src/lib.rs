//! Tether kubehub – object views over kube `DynamicObject`s and watch routing

#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::TryStreamExt;
use kube::{
    api::Api,
    core::{ApiResource, DynamicObject},
    discovery::{Discovery, Scope},
    runtime::watcher::{self, Event as WatchEvent},
    Client,
};
use metrics::counter;
use rustc_hash::FxHashMap;
use tether_core::{Event, Gvk};
use tether_enqueue::{Adder, EventHandler};
use tether_predicate::EventPredicates;
use tracing::{debug, info, trace, warn};

pub mod object;

pub use object::{object_key, KubeObject, Role};

/// Filters events and hands admitted ones to a handler.
#[derive(Clone)]
pub struct Router {
    filter: EventPredicates,
    handler: Arc<dyn EventHandler>,
}

impl Router {
    pub fn new(filter: EventPredicates, handler: Arc<dyn EventHandler>) -> Self {
        Self { filter, handler }
    }

    /// Returns whether the event passed the filter.
    pub fn route(&self, ev: &Event<'_>, queue: &dyn Adder) -> bool {
        counter!("tether_watch_events", 1);
        if !self.filter.admits(ev) {
            trace!(event = ?ev, "event filtered out");
            return false;
        }
        self.handler.handle(ev, queue);
        true
    }
}

/// Turns raw watcher events into create/update/delete events by remembering
/// the last snapshot seen for each object.
pub struct WatchTracker {
    role: Role,
    seen: FxHashMap<String, KubeObject>,
}

impl WatchTracker {
    pub fn new(role: Role) -> Self {
        Self { role, seen: FxHashMap::default() }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn view(&self, o: DynamicObject) -> Option<KubeObject> {
        match KubeObject::new(o, self.role) {
            Ok(obj) => Some(obj),
            Err(e) => {
                warn!(error = %e, "skipping object with malformed spec");
                None
            }
        }
    }

    /// Feed one watcher event. Returns how many routed events passed the filter.
    ///
    /// Objects are keyed by their raw metadata. A live object whose spec stops
    /// parsing keeps its last good snapshot, which a later delete routes.
    pub fn observe(
        &mut self,
        ev: WatchEvent<DynamicObject>,
        router: &Router,
        queue: &dyn Adder,
    ) -> usize {
        match ev {
            WatchEvent::Applied(o) => {
                let key = object_key(&o);
                let Some(new) = self.view(o) else {
                    let tracked = self.seen.contains_key(&key);
                    trace!(key = %key, tracked, "keeping last good snapshot");
                    return 0;
                };
                let old = self.seen.remove(&key);
                let admitted = route_upsert(old.as_ref(), &new, router, queue);
                self.seen.insert(key, new);
                usize::from(admitted)
            }
            WatchEvent::Deleted(o) => {
                let old = self.seen.remove(&object_key(&o));
                match self.view(o).or(old) {
                    Some(gone) => usize::from(router.route(&Event::Delete(&gone), queue)),
                    None => 0,
                }
            }
            WatchEvent::Restarted(list) => {
                debug!(count = list.len(), "watch restart");
                let mut stale = std::mem::take(&mut self.seen);
                let mut admitted = 0;
                for o in list {
                    // Still listed, so never routed as a delete below.
                    let key = object_key(&o);
                    let old = stale.remove(&key);
                    let Some(new) = self.view(o) else {
                        if let Some(old) = old {
                            self.seen.insert(key, old);
                        }
                        continue;
                    };
                    admitted += usize::from(route_upsert(old.as_ref(), &new, router, queue));
                    self.seen.insert(key, new);
                }
                // Objects missing from the relist were deleted while disconnected.
                for (_, gone) in stale {
                    admitted += usize::from(router.route(&Event::Delete(&gone), queue));
                }
                admitted
            }
        }
    }
}

fn route_upsert(
    old: Option<&KubeObject>,
    new: &KubeObject,
    router: &Router,
    queue: &dyn Adder,
) -> bool {
    match old {
        Some(old) => router.route(&Event::Update { old, new }, queue),
        None => router.route(&Event::Create(new), queue),
    }
}

async fn find_api_resource(client: Client, gvk: &Gvk) -> Result<(ApiResource, bool)> {
    let discovery = Discovery::new(client).run().await?;
    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            if ar.group == gvk.group && ar.version == gvk.version && ar.kind == gvk.kind {
                let namespaced = matches!(caps.scope, Scope::Namespaced);
                return Ok((ar.clone(), namespaced));
            }
        }
    }
    Err(anyhow!("GVK not found: {}", gvk))
}

/// List+watch a GVK and route every event through `router` into `queue`.
pub async fn run_watch(
    gvk_key: &str,
    namespace: Option<&str>,
    role: Role,
    router: &Router,
    queue: &dyn Adder,
) -> Result<()> {
    let client = Client::try_default().await?;
    let gvk: Gvk = gvk_key.parse()?;
    let (ar, namespaced) = find_api_resource(client.clone(), &gvk).await?;

    let api: Api<DynamicObject> = match (namespaced, namespace) {
        (true, Some(ns)) => Api::namespaced_with(client.clone(), ns, &ar),
        _ => Api::all_with(client.clone(), &ar),
    };

    let stream = watcher::watcher(api, watcher::Config::default());
    futures::pin_mut!(stream);
    info!(gvk = %gvk_key, ns = ?namespace, role = %role, "watcher started");
    let mut tracker = WatchTracker::new(role);
    while let Some(ev) = stream.try_next().await? {
        tracker.observe(ev, router, queue);
    }
    warn!("watcher stream ended");
    Ok(())
}
