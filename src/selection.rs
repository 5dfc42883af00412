//! Site selection used to filter the dashboard.
//!
//! The selection never influences what is fetched; it is applied to a
//! snapshot before aggregation and rendering.

use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{Availability, SiteView, Snapshot};

/// One row of the filter panel.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub id: String,
    pub name: String,
    pub availability: Availability,
    pub selected: bool,
}

/// Selected site identifiers.
///
/// Starts uninitialised; the first non-empty snapshot selects every site.
/// After that only explicit actions change it.
#[derive(Debug, Clone, Default)]
pub struct SiteSelection {
    selected: BTreeSet<String>,
    initialized: bool,
}

impl SiteSelection {
    /// Selects all sites the first time a non-empty snapshot is seen.
    pub fn sync(&mut self, snapshot: &Snapshot) {
        if !self.initialized && !snapshot.is_empty() {
            self.select_all(snapshot);
        }
    }

    pub fn select_all(&mut self, snapshot: &Snapshot) {
        self.selected = snapshot.sites().iter().map(|s| s.id().to_string()).collect();
        self.initialized = true;
    }

    pub fn select_none(&mut self) {
        self.selected.clear();
        self.initialized = true;
    }

    pub fn select_online(&mut self, snapshot: &Snapshot) {
        self.selected = snapshot
            .sites()
            .iter()
            .filter(|s| s.availability == Availability::Online)
            .map(|s| s.id().to_string())
            .collect();
        self.initialized = true;
    }

    /// Adds the site if absent, removes it otherwise.
    pub fn toggle(&mut self, site_id: &str) {
        if !self.selected.remove(site_id) {
            self.selected.insert(site_id.to_string());
        }
        self.initialized = true;
    }

    pub fn is_selected(&self, site_id: &str) -> bool {
        self.selected.contains(site_id)
    }

    /// Sites of the snapshot that are selected, in snapshot order.
    pub fn apply<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a SiteView> {
        snapshot
            .sites()
            .iter()
            .filter(|s| self.is_selected(s.id()))
            .collect()
    }

    /// Number of selected ids that exist in the snapshot.
    pub fn selected_count(&self, snapshot: &Snapshot) -> usize {
        snapshot
            .sites()
            .iter()
            .filter(|s| self.is_selected(s.id()))
            .count()
    }

    /// Filter panel rows: online sites first, then alphabetical.
    pub fn entries(&self, snapshot: &Snapshot) -> Vec<FilterEntry> {
        snapshot
            .sites()
            .iter()
            .sorted_by(|a, b| {
                let a_offline = a.availability != Availability::Online;
                let b_offline = b.availability != Availability::Online;
                a_offline
                    .cmp(&b_offline)
                    .then_with(|| a.name().cmp(b.name()))
            })
            .map(|s| FilterEntry {
                id: s.id().to_string(),
                name: s.name().to_string(),
                availability: s.availability,
                selected: self.is_selected(s.id()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate;
    use crate::stats::fixtures::{device, site};

    fn snapshot() -> Snapshot {
        Snapshot::new(vec![
            site("s1", "Zeta", vec![device("d1", "ONLINE")], 2),
            site("s2", "Alpha", vec![device("d2", "OFFLINE")], 1),
            site("s3", "Beta", vec![], 0),
            site("s4", "Gamma", vec![device("d3", "ONLINE")], 4),
        ])
    }

    fn ids(sites: &[&SiteView]) -> Vec<String> {
        sites.iter().map(|s| s.id().to_string()).collect()
    }

    #[test]
    fn test_first_snapshot_selects_everything() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        assert!(sel.apply(&snap).is_empty());
        sel.sync(&snap);
        assert_eq!(ids(&sel.apply(&snap)), vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_empty_snapshot_does_not_initialize() {
        let mut sel = SiteSelection::default();
        sel.sync(&Snapshot::default());
        let snap = snapshot();
        sel.sync(&snap);
        assert_eq!(sel.selected_count(&snap), 4);
    }

    #[test]
    fn test_selection_survives_refresh() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        sel.sync(&snap);
        sel.toggle("s2");
        sel.sync(&snapshot());
        assert!(!sel.is_selected("s2"));

        sel.select_none();
        sel.sync(&snapshot());
        assert_eq!(sel.selected_count(&snap), 0);
    }

    #[test]
    fn test_toggle_round_trip() {
        let mut sel = SiteSelection::default();
        sel.toggle("s1");
        assert!(sel.is_selected("s1"));
        sel.toggle("s1");
        assert!(!sel.is_selected("s1"));
    }

    #[test]
    fn test_select_online_only() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        sel.select_online(&snap);
        assert_eq!(ids(&sel.apply(&snap)), vec!["s1", "s4"]);
    }

    #[test]
    fn test_selected_count_ignores_vanished_sites() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        sel.select_all(&snap);
        let smaller = Snapshot::new(snap.sites()[..2].to_vec());
        assert_eq!(sel.selected_count(&smaller), 2);
    }

    #[test]
    fn test_entries_online_first_then_name() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        sel.toggle("s3");
        let names: Vec<_> = sel.entries(&snap).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Gamma", "Zeta", "Alpha", "Beta"]);
        let beta = sel.entries(&snap).into_iter().find(|e| e.id == "s3").unwrap();
        assert!(beta.selected);
    }

    #[test]
    fn test_filtered_stats_match_manual_filter() {
        let snap = snapshot();
        let mut sel = SiteSelection::default();
        sel.sync(&snap);
        sel.toggle("s1");
        sel.toggle("s3");

        let manual: Vec<SiteView> = snap
            .sites()
            .iter()
            .filter(|s| s.id() == "s2" || s.id() == "s4")
            .cloned()
            .collect();
        assert_eq!(aggregate(sel.apply(&snap)), aggregate(&manual));
    }
}
