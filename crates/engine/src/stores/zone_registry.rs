//! Zone ownership registry.
//!
//! Maps each zone to the engine(s) serving it and tracks the player counts
//! engines report for the zones they claim. Built once from the topology and
//! shared as `Arc<ZoneRegistry>`.

use std::collections::{BTreeMap, HashMap, HashSet};

use dashmap::DashMap;
use mudmesh_domain::{EngineAddress, EngineId, ZoneAssignment, ZoneInstance, ZoneMode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("zone '{zone}' is claimed by both {first} and {second} in classic mode")]
    DuplicateZoneOwner {
        zone: String,
        first: EngineId,
        second: EngineId,
    },
    #[error("engine {0} appears more than once in the topology")]
    DuplicateEngine(EngineId),
}

pub struct ZoneRegistry {
    mode: ZoneMode,
    assignments: Vec<ZoneAssignment>,
    loads: DashMap<(EngineId, String), u32>,
}

impl ZoneRegistry {
    pub fn new(mode: ZoneMode, assignments: Vec<ZoneAssignment>) -> Result<Self, TopologyError> {
        let mut seen_engines = HashSet::new();
        let mut owners: HashMap<&str, &EngineId> = HashMap::new();

        for assignment in &assignments {
            let engine_id = &assignment.address.engine_id;
            if !seen_engines.insert(engine_id) {
                return Err(TopologyError::DuplicateEngine(engine_id.clone()));
            }
            for zone in &assignment.zones {
                match owners.get(zone.as_str()) {
                    Some(first) if mode == ZoneMode::Classic => {
                        return Err(TopologyError::DuplicateZoneOwner {
                            zone: zone.clone(),
                            first: (*first).clone(),
                            second: engine_id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(zone.as_str(), engine_id);
                    }
                }
            }
        }

        tracing::debug!(
            mode = %mode,
            engines = assignments.len(),
            zones = owners.len(),
            "Zone registry built"
        );

        Ok(Self {
            mode,
            assignments,
            loads: DashMap::new(),
        })
    }

    pub fn mode(&self) -> ZoneMode {
        self.mode
    }

    pub fn instancing_enabled(&self) -> bool {
        self.mode == ZoneMode::Instanced
    }

    /// First engine (in topology order) claiming `zone`.
    pub fn owner_of(&self, zone: &str) -> Option<EngineAddress> {
        self.assignments
            .iter()
            .find(|a| a.zones.contains(zone))
            .map(|a| a.address.clone())
    }

    /// Zone to owning address, one entry per zone.
    pub fn all_assignments(&self) -> BTreeMap<String, EngineAddress> {
        let mut out = BTreeMap::new();
        for assignment in &self.assignments {
            for zone in &assignment.zones {
                out.entry(zone.clone())
                    .or_insert_with(|| assignment.address.clone());
            }
        }
        out
    }

    /// Whether `engine_id` owns `zone`.
    ///
    /// With instancing, only the first claimant is treated as local; replicas
    /// further down the topology answer `false`.
    pub fn is_local(&self, zone: &str, engine_id: &EngineId) -> bool {
        self.owner_of(zone)
            .is_some_and(|owner| &owner.engine_id == engine_id)
    }

    /// Every engine serving `zone`, in topology order, with its last reported
    /// player count.
    pub fn instances_of(&self, zone: &str) -> Vec<ZoneInstance> {
        self.assignments
            .iter()
            .filter(|a| a.zones.contains(zone))
            .map(|a| {
                let engine_id = a.address.engine_id.clone();
                let player_count = self
                    .loads
                    .get(&(engine_id.clone(), zone.to_string()))
                    .map(|count| *count)
                    .unwrap_or(0);
                ZoneInstance {
                    engine_id,
                    address: a.address.clone(),
                    zone: zone.to_string(),
                    player_count,
                }
            })
            .collect()
    }

    /// Record per-zone player counts reported by `engine_id`.
    ///
    /// Reports from engines outside the topology, and counts for zones the
    /// engine does not claim, are ignored.
    pub fn report_load(&self, engine_id: &EngineId, zone_counts: &HashMap<String, u32>) {
        let Some(assignment) = self.assignment_of(engine_id) else {
            tracing::debug!(engine_id = %engine_id, "Load report from unknown engine ignored");
            return;
        };
        for (zone, count) in zone_counts {
            if assignment.zones.contains(zone) {
                self.loads.insert((engine_id.clone(), zone.clone()), *count);
            } else {
                tracing::debug!(
                    engine_id = %engine_id,
                    zone = %zone,
                    "Load report for unclaimed zone ignored"
                );
            }
        }
    }

    /// Zones claimed by `engine_id`, sorted.
    pub fn zones_of(&self, engine_id: &EngineId) -> Vec<String> {
        self.assignment_of(engine_id)
            .map(|a| a.zones.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn address_of(&self, engine_id: &EngineId) -> Option<EngineAddress> {
        self.assignment_of(engine_id).map(|a| a.address.clone())
    }

    /// Engines in topology order.
    pub fn engines(&self) -> Vec<EngineAddress> {
        self.assignments.iter().map(|a| a.address.clone()).collect()
    }

    /// Distinct zones served by at least one engine, sorted.
    pub fn zones(&self) -> Vec<String> {
        self.all_assignments().into_keys().collect()
    }

    fn assignment_of(&self, engine_id: &EngineId) -> Option<&ZoneAssignment> {
        self.assignments
            .iter()
            .find(|a| &a.address.engine_id == engine_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(id: &str) -> EngineId {
        EngineId::new(id).expect("engine id")
    }

    fn assignment(id: &str, port: u16, zones: &[&str]) -> ZoneAssignment {
        ZoneAssignment::new(
            EngineAddress::new(engine(id), "127.0.0.1", port),
            zones.iter().copied(),
        )
    }

    fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(z, c)| (z.to_string(), *c)).collect()
    }

    #[test]
    fn classic_owner_lookup() {
        let registry = ZoneRegistry::new(
            ZoneMode::Classic,
            vec![
                assignment("engine-1", 7001, &["town", "forest"]),
                assignment("engine-2", 7002, &["dungeon"]),
            ],
        )
        .expect("registry");

        assert_eq!(
            registry.owner_of("dungeon").map(|a| a.engine_id),
            Some(engine("engine-2"))
        );
        assert_eq!(registry.owner_of("ocean"), None);
        assert!(registry.is_local("town", &engine("engine-1")));
        assert!(!registry.is_local("town", &engine("engine-2")));
        assert!(!registry.instancing_enabled());

        let all = registry.all_assignments();
        assert_eq!(all.len(), 3);
        assert_eq!(all["forest"].port, 7001);
    }

    #[test]
    fn classic_rejects_duplicate_claims() {
        let err = ZoneRegistry::new(
            ZoneMode::Classic,
            vec![
                assignment("engine-1", 7001, &["town"]),
                assignment("engine-2", 7002, &["town"]),
            ],
        )
        .err()
        .expect("duplicate claim");

        assert_eq!(
            err,
            TopologyError::DuplicateZoneOwner {
                zone: "town".to_string(),
                first: engine("engine-1"),
                second: engine("engine-2"),
            }
        );
    }

    #[test]
    fn duplicate_engine_is_rejected() {
        let result = ZoneRegistry::new(
            ZoneMode::Instanced,
            vec![
                assignment("engine-1", 7001, &["town"]),
                assignment("engine-1", 7002, &["forest"]),
            ],
        );
        assert!(matches!(result, Err(TopologyError::DuplicateEngine(_))));
    }

    #[test]
    fn instanced_zone_lists_every_replica_in_order() {
        let registry = ZoneRegistry::new(
            ZoneMode::Instanced,
            vec![
                assignment("engine-1", 7001, &["town"]),
                assignment("engine-2", 7002, &["town", "forest"]),
            ],
        )
        .expect("registry");

        let instances = registry.instances_of("town");
        let ids: Vec<_> = instances.iter().map(|i| i.engine_id.clone()).collect();
        assert_eq!(ids, vec![engine("engine-1"), engine("engine-2")]);
        assert!(instances.iter().all(|i| i.player_count == 0));

        assert!(registry.instancing_enabled());
        assert!(registry.is_local("town", &engine("engine-1")));
        assert!(!registry.is_local("town", &engine("engine-2")));
        assert_eq!(
            registry.all_assignments()["town"].engine_id,
            engine("engine-1")
        );
    }

    #[test]
    fn load_reports_last_write_wins() {
        let registry = ZoneRegistry::new(
            ZoneMode::Instanced,
            vec![
                assignment("engine-1", 7001, &["town"]),
                assignment("engine-2", 7002, &["town"]),
            ],
        )
        .expect("registry");

        registry.report_load(&engine("engine-2"), &counts(&[("town", 40)]));
        registry.report_load(&engine("engine-2"), &counts(&[("town", 25)]));

        let loads: Vec<_> = registry
            .instances_of("town")
            .into_iter()
            .map(|i| i.player_count)
            .collect();
        assert_eq!(loads, vec![0, 25]);
    }

    #[test]
    fn load_reports_for_unknown_engine_or_unclaimed_zone_are_ignored() {
        let registry = ZoneRegistry::new(
            ZoneMode::Classic,
            vec![
                assignment("engine-1", 7001, &["town"]),
                assignment("engine-2", 7002, &["forest"]),
            ],
        )
        .expect("registry");

        registry.report_load(&engine("engine-9"), &counts(&[("town", 99)]));
        registry.report_load(&engine("engine-2"), &counts(&[("town", 50), ("forest", 3)]));

        assert_eq!(registry.instances_of("town")[0].player_count, 0);
        assert_eq!(registry.instances_of("forest")[0].player_count, 3);
    }

    #[test]
    fn engine_lookups() {
        let registry = ZoneRegistry::new(
            ZoneMode::Classic,
            vec![assignment("engine-1", 7001, &["town", "forest"])],
        )
        .expect("registry");

        assert_eq!(registry.zones_of(&engine("engine-1")), vec!["forest", "town"]);
        assert!(registry.zones_of(&engine("engine-2")).is_empty());
        assert_eq!(
            registry.address_of(&engine("engine-1")).map(|a| a.port),
            Some(7001)
        );
        assert_eq!(registry.engines().len(), 1);
        assert_eq!(registry.zones(), vec!["forest", "town"]);
    }
}
