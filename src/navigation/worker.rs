// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use super::{plan_route, Config, PlannedRoute, VehicleState};
use crate::{Coord, Graph, SearchContext};

/// Number of requests which may wait for the worker.
const QUEUE_SIZE: usize = 8;

/// A route search request, correlated with its [RouteReply] by `id`.
#[derive(Debug)]
pub struct RouteRequest {
    pub id: u64,
    pub vehicle: VehicleState,
    pub target: Coord,
    pub reply: oneshot::Sender<RouteReply>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteReply {
    pub id: u64,
    pub route: Option<PlannedRoute>,
}

/// Runs [plan_route] on a dedicated thread, so that long searches
/// don't block the caller's async runtime.
///
/// The thread owns its own [SearchContext] and processes requests one by one.
/// It stops once the worker is dropped, after finishing the current request.
#[derive(Debug)]
pub struct RouteWorker {
    sender: Option<mpsc::Sender<RouteRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl RouteWorker {
    pub fn spawn(graph: Arc<Graph>, config: Arc<Config>) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel(QUEUE_SIZE);
        let handle = thread::Builder::new()
            .name("route-worker".into())
            .spawn(move || run(graph, config, receiver))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Sends a request to the worker and returns the channel on which the reply will arrive.
    /// Returns `None` if the worker is no longer running.
    pub async fn submit(&self, id: u64, vehicle: VehicleState, target: Coord) -> Option<oneshot::Receiver<RouteReply>> {
        let sender = self.sender.as_ref()?;
        let (reply, receiver) = oneshot::channel();
        let request = RouteRequest {
            id,
            vehicle,
            target,
            reply,
        };

        match sender.send(request).await {
            Ok(()) => Some(receiver),
            Err(_) => {
                log::error!("route worker is gone, dropping request {}", id);
                None
            }
        }
    }

    /// Sends a request and waits for its reply.
    pub async fn request(&self, id: u64, vehicle: VehicleState, target: Coord) -> Option<RouteReply> {
        self.submit(id, vehicle, target).await?.await.ok()
    }
}

impl Drop for RouteWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("route worker panicked");
            }
        }
    }
}

fn run(graph: Arc<Graph>, config: Arc<Config>, mut receiver: mpsc::Receiver<RouteRequest>) {
    let mut ctx = SearchContext::new(config.capacity);
    log::debug!("route worker started with capacity for {} nodes", ctx.capacity());

    while let Some(req) = receiver.blocking_recv() {
        log::trace!("route worker received request {}", req.id);
        let route = plan_route(&graph, &mut ctx, &req.vehicle, req.target, &config);
        if req.reply.send(RouteReply { id: req.id, route }).is_err() {
            log::debug!("request {} was abandoned", req.id);
        }
    }

    log::debug!("route worker stopped");
}
