//! Offer matching and per-batch offer selection.

use mesos_proto::{Offer, OfferId, Resource, CPUS, MEM, PORTS};
use tracing::{debug, warn};

use crate::dispatch::Dispatch;
use crate::task::TaskRequirements;

/// Returns true if the resources cover CPU, memory and every host port.
///
/// Each condition may be satisfied by any entry with the right name and
/// type; entries of the wrong type are ignored.
pub fn evaluate(resources: &[Resource], requirements: &TaskRequirements) -> bool {
    let covers = |name: &str, needed: f64| {
        resources
            .iter()
            .filter(|r| r.name == name)
            .filter_map(Resource::scalar_value)
            .any(|available| available >= needed)
    };

    if !covers(CPUS, requirements.cpus) || !covers(MEM, requirements.mem) {
        return false;
    }

    if requirements.ports.is_empty() {
        return true;
    }

    resources
        .iter()
        .filter(|r| r.name == PORTS)
        .filter_map(Resource::range_values)
        .any(|ranges| {
            requirements
                .ports
                .iter()
                .all(|port| ranges.iter().any(|range| range.contains(*port)))
        })
}

/// Outcome of scanning one batch of offers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OfferSelection {
    /// The last matching offer in delivery order, if any.
    pub selected: Option<Offer>,
    /// Every offer id in the batch, selected or not, in delivery order.
    pub offer_ids: Vec<OfferId>,
}

impl OfferSelection {
    pub fn selected_id(&self) -> Option<&OfferId> {
        self.selected.as_ref().map(|o| &o.id)
    }
}

/// Scans a batch of offers and resolves every offer before returning.
///
/// Each rejection declines all ids rejected so far in this pass that have not
/// been declined yet. A match supersedes an earlier match, which is then
/// declined along with the next rejection. Ids still undeclined at the end of
/// the scan are declined together; only the selected offer stays open.
///
/// Decline failures are logged and the scan carries on.
pub async fn select_offer<D>(
    dispatcher: &D,
    offers: Vec<Offer>,
    requirements: &TaskRequirements,
) -> OfferSelection
where
    D: Dispatch + ?Sized,
{
    let mut selection = OfferSelection {
        selected: None,
        offer_ids: Vec::with_capacity(offers.len()),
    };
    let mut pending: Vec<OfferId> = Vec::new();

    for offer in offers {
        selection.offer_ids.push(offer.id.clone());

        if evaluate(&offer.resources, requirements) {
            debug!(offer_id = %offer.id, agent_id = %offer.agent_id, "Offer matches");
            if let Some(previous) = selection.selected.replace(offer) {
                pending.push(previous.id);
            }
            continue;
        }

        debug!(offer_id = %offer.id, agent_id = %offer.agent_id, "Offer rejected");
        pending.push(offer.id);
        decline_pending(dispatcher, &mut pending).await;
    }

    decline_pending(dispatcher, &mut pending).await;
    selection
}

async fn decline_pending<D>(dispatcher: &D, pending: &mut Vec<OfferId>)
where
    D: Dispatch + ?Sized,
{
    if pending.is_empty() {
        return;
    }
    let ids = std::mem::take(pending);
    let count = ids.len();
    if let Err(e) = dispatcher.decline(ids).await {
        warn!(offer_count = count, error = %e, "Failed to decline offers");
    }
}
