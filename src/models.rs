//! Data models for the controller's sites, devices and clients, plus the
//! per-cycle snapshot assembled from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic wrapper for controller list responses.
///
/// A response without a `data` key is an empty list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A managed location as reported by the controller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub internal_reference: Option<String>,
}

/// Reported state of a network appliance.
///
/// Only `ONLINE` and `OFFLINE` carry meaning for availability; every other
/// state string is kept verbatim so it can be displayed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Online,
    Offline,
    Other(String),
}

impl DeviceState {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Other(s) => s,
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::Other("UNKNOWN".to_string())
    }
}

impl From<String> for DeviceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ONLINE" => Self::Online,
            "OFFLINE" => Self::Offline,
            _ => Self::Other(s),
        }
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network appliance belonging to one site.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub state: DeviceState,
}

/// An end-user device connected to a site.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Client {
    /// Wireless clients are reported with type `WIRELESS`; anything else is wired.
    pub fn is_wireless(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("wireless"))
    }
}

/// Site availability derived from its devices.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Online,
    Offline,
    Unknown,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A site together with everything fetched for it during one cycle.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SiteView {
    #[serde(flatten)]
    pub site: Site,
    pub availability: Availability,
    pub devices: Vec<Device>,
    pub clients: Vec<Client>,
}

impl SiteView {
    pub fn id(&self) -> &str {
        &self.site.id
    }

    pub fn name(&self) -> &str {
        &self.site.name
    }
}

/// One cycle's immutable view of all sites.
///
/// `total_client_count` is computed once at construction and always equals
/// the sum of client list lengths.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    sites: Vec<SiteView>,
    total_client_count: usize,
}

impl Snapshot {
    pub fn new(sites: Vec<SiteView>) -> Self {
        let total_client_count = sites.iter().map(|s| s.clients.len()).sum();
        Self {
            sites,
            total_client_count,
        }
    }

    pub fn sites(&self) -> &[SiteView] {
        &self.sites
    }

    pub fn total_client_count(&self) -> usize {
        self.total_client_count
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeltaSign {
    Increase,
    Decrease,
}

/// Net change in connected clients between two cycles.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub sign: DeltaSign,
    pub magnitude: usize,
    pub total: usize,
}

impl Delta {
    /// Returns `None` on the first cycle or when the count is unchanged.
    pub fn between(previous: Option<usize>, current: usize) -> Option<Self> {
        let previous = previous?;
        let sign = match current.cmp(&previous) {
            std::cmp::Ordering::Equal => return None,
            std::cmp::Ordering::Greater => DeltaSign::Increase,
            std::cmp::Ordering::Less => DeltaSign::Decrease,
        };
        Some(Self {
            sign,
            magnitude: current.abs_diff(previous),
            total: current,
        })
    }

    /// Human readable summary, e.g. `+3 clients connected`.
    pub fn message(&self) -> String {
        let plural = if self.magnitude == 1 { "" } else { "s" };
        match self.sign {
            DeltaSign::Increase => format!("+{} client{} connected", self.magnitude, plural),
            DeltaSign::Decrease => format!("-{} client{} disconnected", self.magnitude, plural),
        }
    }
}

/// Aggregate statistics over a set of sites.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_sites: usize,
    pub online_sites: usize,
    pub offline_sites: usize,
    pub unknown_sites: usize,
    pub total_devices: usize,
    pub online_devices: usize,
    /// Every device that is not `ONLINE`.
    pub offline_devices: usize,
    /// Device counts keyed by raw state string.
    pub devices_by_state: std::collections::BTreeMap<String, usize>,
    pub total_clients: usize,
    pub health_percent: u8,
}

/// Statistics for a single site card.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub total_clients: usize,
    pub uptime_percent: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod device_state_tests {
        use super::*;

        #[test]
        fn test_known_states_parse() {
            let d: Device = serde_json::from_value(json!({
                "id": "d1", "name": "AP", "model": "U6-Lite", "state": "ONLINE"
            }))
            .unwrap();
            assert_eq!(d.state, DeviceState::Online);
            assert!(d.state.is_online());
        }

        #[test]
        fn test_other_state_kept_verbatim() {
            let d: Device =
                serde_json::from_value(json!({ "id": "d1", "state": "PENDING_ADOPTION" }))
                    .unwrap();
            assert_eq!(d.state, DeviceState::Other("PENDING_ADOPTION".into()));
            assert_eq!(d.state.to_string(), "PENDING_ADOPTION");
            assert_eq!(serde_json::to_value(&d.state).unwrap(), json!("PENDING_ADOPTION"));
        }

        #[test]
        fn test_missing_state_is_not_online() {
            let d: Device = serde_json::from_value(json!({ "id": "d1" })).unwrap();
            assert!(!d.state.is_online());
            assert_eq!(d.name, "");
        }
    }

    mod envelope_tests {
        use super::*;

        #[test]
        fn test_missing_data_is_empty() {
            let env: DataEnvelope<Site> = serde_json::from_value(json!({})).unwrap();
            assert!(env.data.is_empty());
        }

        #[test]
        fn test_site_fields_are_camel_case() {
            let env: DataEnvelope<Site> = serde_json::from_value(json!({
                "data": [{ "id": "s1", "name": "HQ", "internalReference": "default", "extra": 1 }]
            }))
            .unwrap();
            assert_eq!(env.data[0].internal_reference.as_deref(), Some("default"));
        }

        #[test]
        fn test_client_type_field() {
            let c: Client = serde_json::from_value(json!({
                "id": "c1", "name": "laptop", "ipAddress": "10.0.0.2", "type": "Wireless"
            }))
            .unwrap();
            assert!(c.is_wireless());
            assert_eq!(c.ip_address.as_deref(), Some("10.0.0.2"));

            let wired: Client =
                serde_json::from_value(json!({ "id": "c2", "type": "WIRED" })).unwrap();
            assert!(!wired.is_wireless());
        }
    }

    mod delta_tests {
        use super::*;

        #[test]
        fn test_increase() {
            let d = Delta::between(Some(10), 13).unwrap();
            assert_eq!(
                d,
                Delta {
                    sign: DeltaSign::Increase,
                    magnitude: 3,
                    total: 13
                }
            );
            assert_eq!(d.message(), "+3 clients connected");
        }

        #[test]
        fn test_unchanged_emits_nothing() {
            assert_eq!(Delta::between(Some(10), 10), None);
        }

        #[test]
        fn test_first_cycle_emits_nothing() {
            assert_eq!(Delta::between(None, 7), None);
        }

        #[test]
        fn test_single_disconnect_is_singular() {
            let d = Delta::between(Some(5), 4).unwrap();
            assert_eq!(d.sign, DeltaSign::Decrease);
            assert_eq!(d.magnitude, 1);
            assert_eq!(d.message(), "-1 client disconnected");
        }
    }

    #[test]
    fn test_snapshot_total_matches_client_lists() {
        let site = |id: &str, clients: usize| SiteView {
            site: Site {
                id: id.into(),
                name: id.into(),
                internal_reference: None,
            },
            availability: Availability::Unknown,
            devices: vec![],
            clients: (0..clients)
                .map(|i| Client {
                    id: format!("{id}-{i}"),
                    name: String::new(),
                    ip_address: None,
                    kind: None,
                })
                .collect(),
        };
        let snapshot = Snapshot::new(vec![site("a", 2), site("b", 0), site("c", 5)]);
        assert_eq!(snapshot.total_client_count(), 7);
        assert!(!snapshot.is_empty());
        assert!(Snapshot::default().is_empty());
    }
}
