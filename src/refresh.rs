//! One polling round: fetch sites, fan out per-site fetches, derive
//! availability, build the snapshot and diff the client count.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::fetcher::UpstreamClient;
use crate::models::{Delta, Site, SiteView, Snapshot};
use crate::stats::infer_availability;

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub snapshot: Snapshot,
    pub delta: Option<Delta>,
}

/// Runs one refresh cycle.
///
/// Only a failed site-list request fails the cycle. Device and client
/// requests that fail for a site degrade to empty lists. An empty site list
/// yields an empty snapshot and no delta.
///
/// At most `max_concurrency` sites are fetched at once; the snapshot keeps
/// the upstream site order.
pub async fn run_cycle(
    upstream: &UpstreamClient,
    previous_count: Option<usize>,
    max_concurrency: usize,
) -> Result<CycleOutcome, DashboardError> {
    let sites = upstream
        .list_sites()
        .await
        .map_err(|e| DashboardError::SiteListFetch(Box::new(e)))?;

    if sites.is_empty() {
        info!("controller reported no sites");
        return Ok(CycleOutcome {
            snapshot: Snapshot::default(),
            delta: None,
        });
    }

    let views: Vec<SiteView> = stream::iter(sites)
        .map(|site| load_site(upstream, site))
        .buffered(max_concurrency.max(1))
        .collect()
        .await;

    let snapshot = Snapshot::new(views);
    let delta = Delta::between(previous_count, snapshot.total_client_count());

    info!(
        sites = snapshot.sites().len(),
        clients = snapshot.total_client_count(),
        "refresh cycle complete"
    );

    Ok(CycleOutcome { snapshot, delta })
}

async fn load_site(upstream: &UpstreamClient, site: Site) -> SiteView {
    let (devices, clients) = tokio::join!(
        upstream.list_devices(&site.id),
        upstream.list_clients(&site.id)
    );
    let devices = or_empty(devices, &site.id, "devices");
    let clients = or_empty(clients, &site.id, "clients");
    let availability = infer_availability(&devices);

    SiteView {
        site,
        availability,
        devices,
        clients,
    }
}

fn or_empty<T>(result: Result<Vec<T>, DashboardError>, site_id: &str, resource: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(site_id, resource, error = %e, "per-site fetch failed, using empty list");
        Vec::new()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::fetcher::UpstreamClient;

    pub async fn upstream() -> (MockServer, UpstreamClient) {
        let server = MockServer::start().await;
        let client = UpstreamClient::new(
            &server.uri(),
            &SecretString::from("test-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        (server, client)
    }

    pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    /// Mounts a site list plus device and client lists for each site.
    ///
    /// Each entry is `(site_id, device_states, client_count)`.
    pub async fn mount_sites(server: &MockServer, sites: &[(&str, &[&str], usize)]) {
        let list: Vec<Value> = sites
            .iter()
            .map(|(id, _, _)| json!({ "id": id, "name": format!("Site {id}") }))
            .collect();
        mount_json(server, "/sites", json!({ "data": list })).await;

        for (id, states, clients) in sites {
            let devices: Vec<Value> = states
                .iter()
                .enumerate()
                .map(|(i, state)| {
                    json!({ "id": format!("{id}-d{i}"), "name": "AP", "model": "U6", "state": state })
                })
                .collect();
            let clients: Vec<Value> = (0..*clients)
                .map(|i| json!({ "id": format!("{id}-c{i}"), "name": "phone" }))
                .collect();
            mount_json(server, &format!("/sites/{id}/devices"), json!({ "data": devices })).await;
            mount_json(server, &format!("/sites/{id}/clients"), json!({ "data": clients })).await;
        }
    }
}
