// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Live navigation on top of [find_route](crate::find_route).
//!
//! The building blocks are usable on their own:
//! - [resolve_start] decides where a search for a moving vehicle starts,
//! - [find_flexible_route] widens the set of destination nodes until a route is found,
//! - [RouteStats] and [Progress] track the remaining distance and time along a path.
//!
//! [Navigator] ties them together into a session: it keeps the followed route
//! in sync with a stream of [VehicleState] samples, recomputing it in the background
//! on a [RouteWorker] thread when the vehicle leaves it, and publishes the result
//! as a [RouteView].

mod config;
mod progress;
mod route;
mod session;
mod start;
mod stats;
mod worker;

pub use config::{Config, SearchRadius, DEFAULT_DESTINATION_RADII};
pub use progress::{Progress, Tracking};
pub use route::{find_flexible_route, merge_close_points, plan_route, PlannedRoute};
pub use session::{Navigator, NoPlaceNames, PlaceNames, RouteOutcome, RouteSummary, RouteView};
pub use start::{resolve_start, StartConfig, VehicleState};
pub use stats::{DenseArea, RouteStats, StatsProfile};
pub use worker::{RouteReply, RouteRequest, RouteWorker};
