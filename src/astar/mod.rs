// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod context;
mod error;
mod profile;
mod search;

pub use context::{SearchContext, DEFAULT_MAX_NODES};
pub use error::SearchError;
pub use profile::{CostProfile, StartMode, TRUCK_PROFILE};
pub use search::{find_route, Route, SearchQuery};
