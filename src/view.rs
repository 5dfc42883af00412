//! View models handed to the templates and the JSON dashboard endpoint.
//!
//! Everything here is derived from the session; nothing feeds back into it.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::{Availability, Client, DashboardStats, Delta, DeltaSign, Device, SiteView};
use crate::selection::FilterEntry;
use crate::state::Session;
use crate::stats::{aggregate, site_stats};

/// Entries shown before the "Show N more" disclosure.
pub const LIST_PREVIEW_LEN: usize = 5;

/// A list split into the always-visible head and the collapsible rest.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DetailList<T> {
    pub total: usize,
    pub shown: Vec<T>,
    pub hidden: Vec<T>,
}

impl<T> DetailList<T> {
    fn split(mut items: Vec<T>) -> Self {
        let total = items.len();
        let hidden = items.split_off(total.min(LIST_PREVIEW_LEN));
        Self {
            total,
            shown: items,
            hidden,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DeviceRow {
    pub name: String,
    pub model: String,
    pub state: String,
    pub online: bool,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            model: d.model.clone(),
            state: d.state.to_string(),
            online: d.state.is_online(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ClientRow {
    pub name: String,
    pub ip_address: String,
    pub kind: Option<String>,
    pub wireless: bool,
}

impl From<&Client> for ClientRow {
    fn from(c: &Client) -> Self {
        Self {
            name: c.name.clone(),
            ip_address: c.ip_address.clone().unwrap_or_else(|| "N/A".to_string()),
            kind: c.kind.clone(),
            wireless: c.is_wireless(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SiteCard {
    pub id: String,
    pub name: String,
    pub internal_reference: Option<String>,
    pub availability: Availability,
    pub css_class: String,
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub total_clients: usize,
    pub uptime_percent: u8,
    /// Card body hidden by the user.
    pub collapsed: bool,
    pub devices: DetailList<DeviceRow>,
    pub clients: DetailList<ClientRow>,
}

impl From<&SiteView> for SiteCard {
    fn from(site: &SiteView) -> Self {
        let stats = site_stats(site);
        Self {
            id: site.id().to_string(),
            name: site.name().to_string(),
            internal_reference: site.site.internal_reference.clone(),
            availability: site.availability,
            css_class: site.availability.as_str().to_lowercase(),
            total_devices: stats.total_devices,
            online_devices: stats.online_devices,
            offline_devices: stats.offline_devices,
            total_clients: stats.total_clients,
            uptime_percent: stats.uptime_percent,
            collapsed: false,
            devices: DetailList::split(site.devices.iter().map(DeviceRow::from).collect()),
            clients: DetailList::split(site.clients.iter().map(ClientRow::from).collect()),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub message: String,
    pub total: usize,
    pub increase: bool,
}

impl From<Delta> for NotificationView {
    fn from(delta: Delta) -> Self {
        Self {
            message: delta.message(),
            total: delta.total,
            increase: delta.sign == DeltaSign::Increase,
        }
    }
}

/// Everything the dashboard page and `/api/dashboard` show.
#[derive(Debug, Serialize, Clone)]
pub struct DashboardView {
    pub loaded: bool,
    pub error: Option<String>,
    /// The controller reported no sites at all.
    pub no_sites: bool,
    pub stats: DashboardStats,
    pub sites: Vec<SiteCard>,
    pub filters: Vec<FilterEntry>,
    pub filter_visible: bool,
    pub selected_count: usize,
    pub site_count: usize,
    pub notification: Option<NotificationView>,
    pub auto_refresh: bool,
    pub next_refresh_secs: Option<u64>,
    pub refresh_interval_secs: u64,
}

impl DashboardView {
    pub fn build(
        session: &Session,
        now: Instant,
        notification_ttl: Duration,
        next_refresh_secs: Option<u64>,
        refresh_interval: Duration,
    ) -> Self {
        let snapshot = session.snapshot();
        let filtered = session.filtered_sites();

        Self {
            loaded: session.is_loaded(),
            error: session.last_error().map(str::to_string),
            no_sites: session.is_loaded() && snapshot.is_empty(),
            stats: aggregate(filtered.iter().copied()),
            sites: filtered
                .iter()
                .map(|site| SiteCard {
                    collapsed: session.is_collapsed(site.id()),
                    ..SiteCard::from(*site)
                })
                .collect(),
            filters: session.selection().entries(snapshot),
            filter_visible: session.filter_visible(),
            selected_count: session.selection().selected_count(snapshot),
            site_count: snapshot.sites().len(),
            notification: session
                .active_notification(now, notification_ttl)
                .map(NotificationView::from),
            auto_refresh: next_refresh_secs.is_some(),
            next_refresh_secs,
            refresh_interval_secs: refresh_interval.as_secs(),
        }
    }
}
