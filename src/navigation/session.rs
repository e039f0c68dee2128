// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use super::{Config, Progress, RouteReply, RouteStats, RouteWorker, Tracking, VehicleState};
use crate::{Coord, Graph, StartMode};

/// Source of human-readable names for destinations.
pub trait PlaceNames: Send + Sync {
    fn describe(&self, at: Coord) -> Option<String>;
}

/// [PlaceNames] which knows no places.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlaceNames;

impl PlaceNames for NoPlaceNames {
    fn describe(&self, _: Coord) -> Option<String> {
        None
    }
}

impl<F> PlaceNames for F
where
    F: Fn(Coord) -> Option<String> + Send + Sync,
{
    fn describe(&self, at: Coord) -> Option<String> {
        self(at)
    }
}

/// State of the followed route, as presented to the user.
/// An empty path means there's no route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteView {
    pub path: Vec<Coord>,
    pub remaining_km: f64,
    pub remaining_hours: f64,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    /// Graph node at which the route ends.
    pub end: u32,
    pub path: Vec<Coord>,
    pub total_km: f64,
    pub total_hours: f64,
    pub mode: StartMode,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(RouteSummary),
    NotFound,

    /// Another search was already running; the request was dropped.
    Busy,

    /// The route was cleared or replaced while the search was running.
    Superseded,
}

#[derive(Debug)]
struct ActiveRoute {
    path: Vec<Coord>,
    stats: RouteStats,
    progress: Progress,
}

#[derive(Debug, Default)]
struct State {
    route: Option<ActiveRoute>,
    destination: Option<Coord>,
}

struct Shared {
    config: Arc<Config>,
    worker: RouteWorker,
    places: Box<dyn PlaceNames>,
    state: Mutex<State>,
    in_flight: AtomicBool,
    latest: AtomicU64,
    view: watch::Sender<RouteView>,
}

/// Resets the single-flight flag when dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps a route to a destination up to date while the vehicle moves.
///
/// Searches run on a [RouteWorker] thread. At most one search runs at a time:
/// requests made in the meantime are dropped with [RouteOutcome::Busy]. Every request
/// and every [Navigator::clear_route] call invalidates replies of earlier searches,
/// which are then discarded with [RouteOutcome::Superseded].
///
/// Cloning a navigator is cheap; all clones share the same session.
#[derive(Clone)]
pub struct Navigator {
    shared: Arc<Shared>,
}

impl Navigator {
    pub fn new(graph: Arc<Graph>, config: Config) -> io::Result<Self> {
        Self::with_place_names(graph, config, NoPlaceNames)
    }

    pub fn with_place_names<P: PlaceNames + 'static>(
        graph: Arc<Graph>,
        config: Config,
        places: P,
    ) -> io::Result<Self> {
        let config = Arc::new(config);
        let worker = RouteWorker::spawn(graph, config.clone())?;
        let (view, _) = watch::channel(RouteView::default());

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                worker,
                places: Box::new(places),
                state: Mutex::new(State::default()),
                in_flight: AtomicBool::new(false),
                latest: AtomicU64::new(0),
                view,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns a receiver notified on every change of the [RouteView].
    pub fn subscribe(&self) -> watch::Receiver<RouteView> {
        self.shared.view.subscribe()
    }

    pub fn view(&self) -> RouteView {
        self.shared.view.borrow().clone()
    }

    /// Returns the target of the followed route.
    pub fn destination(&self) -> Option<Coord> {
        self.shared.state.lock().destination
    }

    pub fn is_searching(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Searches for a route from the vehicle to `target` and starts following it.
    pub async fn navigate_to(&self, target: Coord, vehicle: VehicleState) -> RouteOutcome {
        self.search(target, vehicle).await
    }

    /// Searches for a new route from the vehicle to the destination of the followed route.
    pub async fn recompute(&self, vehicle: VehicleState) -> RouteOutcome {
        let destination = self.shared.state.lock().destination;
        let Some(target) = destination else {
            log::debug!("nothing to recompute, no destination set");
            return RouteOutcome::NotFound;
        };
        self.search(target, vehicle).await
    }

    /// Stops following the current route and discards replies of running searches.
    pub fn clear_route(&self) {
        let mut state = self.shared.state.lock();
        state.route = None;
        state.destination = None;
        self.shared.latest.fetch_add(1, Ordering::AcqRel);
        self.shared.view.send_replace(RouteView::default());
    }

    /// Matches a new vehicle position against the followed route.
    ///
    /// Updates the remaining distance and time of the [RouteView], clears the route
    /// on arrival, and starts a recomputation in the background when the vehicle left
    /// the route. The latter requires a Tokio runtime.
    pub fn update_position(&self, vehicle: VehicleState) -> Tracking {
        let tracking = {
            let mut state = self.shared.state.lock();
            let State { route, destination } = &mut *state;
            let Some(active) = route.as_mut() else {
                return Tracking::Idle;
            };

            let tracking = active.progress.update(
                &active.path,
                &active.stats,
                vehicle.position,
                &self.shared.config,
            );

            match tracking {
                Tracking::OnRoute {
                    remaining_km,
                    remaining_hours,
                    ..
                } => self.shared.view.send_modify(|view| {
                    view.remaining_km = remaining_km;
                    view.remaining_hours = remaining_hours;
                }),

                Tracking::Arrived => {
                    log::info!("arrived at {:?}", destination);
                    *route = None;
                    *destination = None;
                    self.shared.latest.fetch_add(1, Ordering::AcqRel);
                    self.shared.view.send_replace(RouteView::default());
                }

                _ => {}
            }

            tracking
        };

        if let Tracking::Deviated { distance_sq } = tracking {
            log::debug!("vehicle left the route (distance² {:.6})", distance_sq);
            self.spawn_recompute(vehicle);
        }

        tracking
    }

    /// Feeds every received vehicle state into [Navigator::update_position],
    /// until the sender is closed.
    pub async fn follow(&self, mut positions: mpsc::Receiver<VehicleState>) {
        while let Some(vehicle) = positions.recv().await {
            self.update_position(vehicle);
        }
    }

    fn spawn_recompute(&self, vehicle: VehicleState) {
        if self.is_searching() {
            log::trace!("search already running, not recomputing");
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let navigator = self.clone();
                runtime.spawn(async move {
                    let outcome = navigator.recompute(vehicle).await;
                    log::debug!("recomputed route: {:?}", outcome_name(&outcome));
                });
            }
            Err(_) => log::warn!("no async runtime available, can't recompute the route"),
        }
    }

    fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.shared.in_flight))
    }

    async fn search(&self, target: Coord, vehicle: VehicleState) -> RouteOutcome {
        let Some(_guard) = self.try_begin() else {
            log::debug!("search already running, dropping request to {:?}", target);
            return RouteOutcome::Busy;
        };

        let Some(reply) = self.dispatch(target, vehicle).await else {
            return RouteOutcome::NotFound;
        };

        match reply.await {
            Ok(reply) => self.accept(target, reply),
            Err(_) => {
                log::error!("route worker dropped request to {:?}", target);
                RouteOutcome::NotFound
            }
        }
    }

    /// Sends a new request to the worker, invalidating all previous ones.
    async fn dispatch(&self, target: Coord, vehicle: VehicleState) -> Option<oneshot::Receiver<RouteReply>> {
        let id = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.worker.submit(id, vehicle, target).await
    }

    fn accept(&self, target: Coord, reply: RouteReply) -> RouteOutcome {
        let mut state = self.shared.state.lock();

        let latest = self.shared.latest.load(Ordering::Acquire);
        if reply.id != latest {
            log::debug!("discarding reply {}, latest request is {}", reply.id, latest);
            return RouteOutcome::Superseded;
        }

        let Some(planned) = reply.route else {
            log::debug!("no route to {:?}", target);
            return RouteOutcome::NotFound;
        };

        let summary = RouteSummary {
            end: planned.route.end,
            path: planned.path.clone(),
            total_km: planned.stats.total_km(),
            total_hours: planned.stats.total_hours(),
            mode: planned.start.mode,
            destination: self.shared.places.describe(target),
        };

        state.destination = Some(target);
        state.route = Some(ActiveRoute {
            path: planned.path,
            stats: planned.stats,
            progress: Progress::default(),
        });

        self.shared.view.send_replace(RouteView {
            path: summary.path.clone(),
            remaining_km: summary.total_km,
            remaining_hours: summary.total_hours,
            destination: summary.destination.clone(),
        });

        RouteOutcome::Found(summary)
    }
}

fn outcome_name(outcome: &RouteOutcome) -> &'static str {
    match outcome {
        RouteOutcome::Found(_) => "found",
        RouteOutcome::NotFound => "not found",
        RouteOutcome::Busy => "busy",
        RouteOutcome::Superseded => "superseded",
    }
}
