//! Per-visit capture of network traffic.
//!
//! The driver pushes events into a bounded channel through a [`NetworkTap`];
//! the runner drains the channel synchronously once the visit ends. Events
//! that do not fit are counted and dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{contains_any, API_RESPONSE_TERMS, REQUEST_URL_TERMS};

/// Raw event as observed by a driver. Timestamps are taken when the driver saw the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Request {
        url: String,
        method: String,
        resource_type: String,
        timestamp: DateTime<Utc>,
    },
    Response {
        url: String,
        status: u16,
        timestamp: DateTime<Utc>,
    },
}

impl NetworkEvent {
    /// URL matching is case-sensitive.
    pub fn is_retained(&self) -> bool {
        match self {
            NetworkEvent::Request { url, .. } => contains_any(url, REQUEST_URL_TERMS),
            NetworkEvent::Response { url, status, .. } => {
                *status == 200 && contains_any(url, API_RESPONSE_TERMS)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub url: String,
    pub method: String,
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    pub url: String,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
    pub page_url: String,
}

/// Sending half handed to the driver for one visit.
#[derive(Debug, Clone)]
pub struct NetworkTap {
    tx: SyncSender<NetworkEvent>,
    dropped: Arc<AtomicUsize>,
}

impl NetworkTap {
    /// Never blocks. Irrelevant events are discarded before they reach the channel.
    pub fn emit(&self, event: NetworkEvent) {
        if !event.is_retained() {
            return;
        }
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub struct NetworkObserver {
    rx: Receiver<NetworkEvent>,
    tap: NetworkTap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedTraffic {
    pub requests: Vec<CapturedRequest>,
    pub api_responses: Vec<ApiEndpoint>,
    pub dropped: usize,
}

impl NetworkObserver {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        Self {
            rx,
            tap: NetworkTap {
                tx,
                dropped: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    pub fn tap(&self) -> NetworkTap {
        self.tap.clone()
    }

    /// Everything captured so far, attributed to `page_url`, in arrival order.
    pub fn drain(self, page_url: &str) -> ObservedTraffic {
        let mut traffic = ObservedTraffic {
            dropped: self.tap.dropped.load(Ordering::Relaxed),
            ..ObservedTraffic::default()
        };
        for event in self.rx.try_iter() {
            match event {
                NetworkEvent::Request {
                    url,
                    method,
                    resource_type,
                    timestamp,
                } => traffic.requests.push(CapturedRequest {
                    url,
                    method,
                    resource_type,
                    timestamp,
                    page_url: page_url.to_string(),
                }),
                NetworkEvent::Response {
                    url,
                    status,
                    timestamp,
                } => traffic.api_responses.push(ApiEndpoint {
                    url,
                    status,
                    timestamp,
                    page_url: page_url.to_string(),
                }),
            }
        }
        traffic
    }
}
