//! Pure diffing: snapshot + observations → mutations.

use std::collections::{HashMap, HashSet};

use crate::discovery::Candidate;
use crate::health::{Action, HealthPolicy};
use crate::probe::ProbeOutcome;
use crate::registry::{EndpointKey, IdGenerator, Mutation, RegisteredEndpoint, Snapshot};

/// Stage a suspended create for every candidate not yet registered.
///
/// Candidates repeated within one listing are created once.
pub fn plan_discovery(
    snapshot: &Snapshot,
    candidates: &[Candidate],
    ids: &dyn IdGenerator,
) -> Vec<Mutation> {
    let mut known: HashSet<EndpointKey> = snapshot.endpoints.iter().map(|e| e.key()).collect();

    candidates
        .iter()
        .filter(|c| known.insert(c.key()))
        .map(|c| Mutation::Create(RegisteredEndpoint::new_suspended(ids.next_id(), &c.host, c.port)))
        .collect()
}

/// Fold probe outcomes through the health policy.
///
/// Endpoints without an outcome, or whose decision is `None`, are left alone.
pub fn plan_health(
    snapshot: &Snapshot,
    outcomes: &HashMap<String, ProbeOutcome>,
    policy: &HealthPolicy,
) -> Vec<Mutation> {
    snapshot
        .endpoints
        .iter()
        .filter_map(|endpoint| {
            let outcome = outcomes.get(&endpoint.name)?;
            match policy.decide(endpoint.is_suspended(), outcome).action {
                Action::None => None,
                Action::Suspend => Some(Mutation::Edit(endpoint.with_suspended(true))),
                Action::Resume => Some(Mutation::Edit(endpoint.with_suspended(false))),
                Action::Remove => Some(Mutation::Delete {
                    name: endpoint.name.clone(),
                }),
            }
        })
        .collect()
}
