//! Availability inference and statistics aggregation.
//!
//! Everything here is a pure fold over already-fetched data so the same
//! functions serve the full snapshot and any filtered subset of it.

use crate::models::{Availability, DashboardStats, Device, SiteStats, SiteView};

/// Infers site availability from its devices.
///
/// `Unknown` when there are no devices, `Online` when at least one device is
/// online, `Offline` otherwise.
pub fn infer_availability(devices: &[Device]) -> Availability {
    if devices.is_empty() {
        Availability::Unknown
    } else if devices.iter().any(|d| d.state.is_online()) {
        Availability::Online
    } else {
        Availability::Offline
    }
}

/// Percentage of online devices, rounded to the nearest whole number.
/// Zero when there are no devices.
///
/// The ratio is taken in floating point before scaling, so 23 of 40 is
/// 57.499.. and rounds down to 57.
pub fn health_percentage(online: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = online.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

/// Counts for one site card.
pub fn site_stats(site: &SiteView) -> SiteStats {
    let total_devices = site.devices.len();
    let online_devices = count_online(&site.devices);
    SiteStats {
        total_devices,
        online_devices,
        offline_devices: total_devices - online_devices,
        total_clients: site.clients.len(),
        uptime_percent: health_percentage(online_devices, total_devices),
    }
}

/// Aggregates dashboard-wide statistics over the given sites.
pub fn aggregate<'a, I>(sites: I) -> DashboardStats
where
    I: IntoIterator<Item = &'a SiteView>,
{
    let mut stats = DashboardStats::default();

    for site in sites {
        stats.total_sites += 1;
        match site.availability {
            Availability::Online => stats.online_sites += 1,
            Availability::Offline => stats.offline_sites += 1,
            Availability::Unknown => stats.unknown_sites += 1,
        }

        stats.total_devices += site.devices.len();
        stats.online_devices += count_online(&site.devices);
        for device in &site.devices {
            *stats
                .devices_by_state
                .entry(device.state.as_str().to_string())
                .or_insert(0) += 1;
        }

        stats.total_clients += site.clients.len();
    }

    stats.offline_devices = stats.total_devices - stats.online_devices;
    stats.health_percent = health_percentage(stats.online_devices, stats.total_devices);
    stats
}

fn count_online(devices: &[Device]) -> usize {
    devices.iter().filter(|d| d.state.is_online()).count()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Client, Device, DeviceState, Site, SiteView};

    pub fn device(id: &str, state: &str) -> Device {
        Device {
            id: id.to_string(),
            name: format!("device {id}"),
            model: "U6-Pro".to_string(),
            state: DeviceState::from(state.to_string()),
        }
    }

    pub fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            name: format!("client {id}"),
            ip_address: Some("192.168.1.20".to_string()),
            kind: Some("WIRELESS".to_string()),
        }
    }

    pub fn site(id: &str, name: &str, devices: Vec<Device>, clients: usize) -> SiteView {
        let availability = super::infer_availability(&devices);
        SiteView {
            site: Site {
                id: id.to_string(),
                name: name.to_string(),
                internal_reference: None,
            },
            availability,
            devices,
            clients: (0..clients).map(|i| client(&format!("{id}-c{i}"))).collect(),
        }
    }
}
