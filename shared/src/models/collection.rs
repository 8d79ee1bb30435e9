//! Waste collection models and lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Actor, Role};
use crate::error::{DomainError, DomainResult};
use crate::types::Location;

/// Status of a waste pickup request
///
/// ```text
/// pending -> accepted -> in_progress -> completed
///    \-> cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Pending => "pending",
            CollectionStatus::Accepted => "accepted",
            CollectionStatus::InProgress => "in_progress",
            CollectionStatus::Completed => "completed",
            CollectionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CollectionStatus::Pending),
            "accepted" => Some(CollectionStatus::Accepted),
            "in_progress" => Some(CollectionStatus::InProgress),
            "completed" => Some(CollectionStatus::Completed),
            "cancelled" => Some(CollectionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CollectionStatus::Completed | CollectionStatus::Cancelled)
    }

    /// Statuses counted as open work for a collector
    pub const ACTIVE: [CollectionStatus; 2] =
        [CollectionStatus::Accepted, CollectionStatus::InProgress];
}

/// A status change requested on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionTransition {
    /// A collector claims a pending request
    Accept,
    /// A collector declines a pending request
    Reject,
    /// The assigned collector heads out
    Start,
    /// The assigned collector finishes the pickup
    Complete,
    /// The citizen withdraws a request nobody has claimed
    Cancel,
}

impl CollectionTransition {
    pub const ALL: [CollectionTransition; 5] = [
        CollectionTransition::Accept,
        CollectionTransition::Reject,
        CollectionTransition::Start,
        CollectionTransition::Complete,
        CollectionTransition::Cancel,
    ];

    /// The only status this transition may leave from
    pub fn source(&self) -> CollectionStatus {
        match self {
            CollectionTransition::Accept
            | CollectionTransition::Reject
            | CollectionTransition::Cancel => CollectionStatus::Pending,
            CollectionTransition::Start => CollectionStatus::Accepted,
            CollectionTransition::Complete => CollectionStatus::InProgress,
        }
    }

    pub fn target(&self) -> CollectionStatus {
        match self {
            CollectionTransition::Accept => CollectionStatus::Accepted,
            CollectionTransition::Reject | CollectionTransition::Cancel => {
                CollectionStatus::Cancelled
            }
            CollectionTransition::Start => CollectionStatus::InProgress,
            CollectionTransition::Complete => CollectionStatus::Completed,
        }
    }

    /// Map a requested target status onto the transition reaching it.
    ///
    /// Only the statuses reachable through a status update (completion by
    /// the collector, cancellation by the citizen) are accepted here; the
    /// other transitions have dedicated endpoints.
    pub fn for_requested_status(status: CollectionStatus) -> DomainResult<Self> {
        match status {
            CollectionStatus::Completed => Ok(CollectionTransition::Complete),
            CollectionStatus::Cancelled => Ok(CollectionTransition::Cancel),
            _ => Err(DomainError::InvalidState(
                "This status can only be reached through its dedicated action",
            )),
        }
    }
}

/// The fields of a collection that decide which transitions are allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionState {
    pub status: CollectionStatus,
    pub citizen_id: Uuid,
    pub collector_id: Option<Uuid>,
}

impl CollectionState {
    pub fn new_request(citizen_id: Uuid) -> Self {
        Self {
            status: CollectionStatus::Pending,
            citizen_id,
            collector_id: None,
        }
    }

    /// Check that `actor` may apply `transition` to this collection.
    ///
    /// Authorization is checked before the source state, so a collection in
    /// the wrong state still reports `Forbidden` to a stranger.
    pub fn check(&self, actor: &Actor, transition: CollectionTransition) -> DomainResult<()> {
        match transition {
            CollectionTransition::Accept | CollectionTransition::Reject => {
                if actor.role != Role::Collector {
                    return Err(DomainError::Forbidden("Unauthorized"));
                }
                if self.status != CollectionStatus::Pending {
                    return Err(DomainError::InvalidState("Collection is not pending"));
                }
            }
            CollectionTransition::Start => {
                if actor.role != Role::Collector {
                    return Err(DomainError::Forbidden("Unauthorized"));
                }
                if self.collector_id != Some(actor.id) {
                    return Err(DomainError::Forbidden("Not your collection"));
                }
                if self.status != CollectionStatus::Accepted {
                    return Err(DomainError::InvalidState(
                        "Collection must be accepted first",
                    ));
                }
            }
            CollectionTransition::Complete => {
                if actor.role != Role::Collector || self.collector_id != Some(actor.id) {
                    return Err(DomainError::Forbidden("Not your collection"));
                }
                if self.status != CollectionStatus::InProgress {
                    return Err(DomainError::InvalidState(
                        "Collection must be in progress to be completed",
                    ));
                }
            }
            CollectionTransition::Cancel => {
                if actor.id != self.citizen_id {
                    return Err(DomainError::Forbidden("Not your collection"));
                }
                if self.status != CollectionStatus::Pending {
                    return Err(DomainError::InvalidState(
                        "Only pending collections can be cancelled",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Apply a transition in memory, leaving `self` untouched on error
    pub fn apply(&mut self, actor: &Actor, transition: CollectionTransition) -> DomainResult<()> {
        self.check(actor, transition)?;
        if transition == CollectionTransition::Accept {
            self.collector_id = Some(actor.id);
        }
        self.status = transition.target();
        Ok(())
    }

    /// `collector_id` is set exactly when a collector has claimed the request
    pub fn is_consistent(&self) -> bool {
        match self.status {
            CollectionStatus::Pending => self.collector_id.is_none(),
            CollectionStatus::Accepted
            | CollectionStatus::InProgress
            | CollectionStatus::Completed => self.collector_id.is_some(),
            CollectionStatus::Cancelled => true,
        }
    }
}

/// A waste pickup request as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub citizen_name: String,
    pub collector_id: Option<Uuid>,
    pub collector_name: Option<String>,
    pub waste_type: String,
    /// Free text as typed by the citizen, e.g. "50kg" or "3 sacs"
    pub quantity: String,
    pub status: CollectionStatus,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    /// Whether the citizen already reviewed the assigned collector
    pub has_rated: bool,
}
