//! Schema history and data migrations.
//!
//! Stored state carries a `schemaVersion` date stamp. Upgrades run as an
//! ordered list of pure transforms over the composite record; a migration
//! applies when the detected version is at or below its source version, so
//! old data passes through every later step in sequence.

use serde::{Deserialize, Serialize};

/// Oldest schema we still upgrade. Anything older is reset.
pub const MIN_SUPPORTED_VERSION: i64 = 20220713;
/// Stamp written with current data.
///
/// History: 20220713 dropped the internal `#surface` layer from dismissal
/// ids; 20220803 fixed coordinate precision in generated ids; 20220929
/// namespaced dismissal entries with `G:`/`M:`; 20221114 collapsed loose
/// keys into one composite record; 20221115 moved to the current key
/// namespace.
pub const LATEST_VERSION: i64 = 20221115;

/// The composite `"*"` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedData {
    #[serde(default)]
    pub dismissed: Vec<String>,
    #[serde(default)]
    pub background: i64,
}

pub struct DataMigration {
    /// Highest schema version this transform still applies to.
    pub source_version: i64,
    pub apply: fn(PersistedData) -> PersistedData,
}

pub const DATA_MIGRATIONS: &[DataMigration] = &[
    DataMigration {
        source_version: 20220713,
        apply: reencode_dismissal_coordinates,
    },
    DataMigration {
        source_version: 20220803,
        apply: prefix_dismissals_with_marker_namespace,
    },
];

/// 20220713 -> 20220803: generated ids gained fixed 3-decimal coordinate
/// precision. Entries that do not parse as `name@row:col` are kept as-is.
fn reencode_dismissal_coordinates(mut data: PersistedData) -> PersistedData {
    data.dismissed = data
        .dismissed
        .into_iter()
        .map(|id| reencode_generated_id(&id).unwrap_or(id))
        .collect();
    data
}

fn reencode_generated_id(id: &str) -> Option<String> {
    let (name, coords) = id.split_once('@')?;
    let (row, col) = coords.split_once(':')?;
    let row: f64 = row.parse().ok()?;
    let col: f64 = col.parse().ok()?;
    Some(format!("{name}@{row:.3}:{col:.3}"))
}

/// 20220803 -> 20220929: dismissal entries gained a `M:`/`G:` namespace;
/// everything stored before then was a marker.
fn prefix_dismissals_with_marker_namespace(mut data: PersistedData) -> PersistedData {
    data.dismissed = data
        .dismissed
        .into_iter()
        .map(|id| format!("M:{id}"))
        .collect();
    data
}

/// Run every migration applicable from `version` onward.
pub fn upgrade_data(version: i64, mut data: PersistedData) -> PersistedData {
    for migration in DATA_MIGRATIONS {
        if version <= migration.source_version {
            data = (migration.apply)(data);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::{PersistedData, upgrade_data};
    use pretty_assertions::assert_eq;

    fn data(dismissed: &[&str]) -> PersistedData {
        PersistedData {
            dismissed: dismissed.iter().map(|s| s.to_string()).collect(),
            background: 0,
        }
    }

    #[test]
    fn oldest_version_runs_the_whole_chain() {
        let out = upgrade_data(20220713, data(&["Ore@1.5:2", "note-17"]));
        // Re-encoded to 3 decimals, then namespaced.
        assert_eq!(out.dismissed, ["M:Ore@1.500:2.000", "M:note-17"]);
    }

    #[test]
    fn mid_chain_version_skips_earlier_steps() {
        let out = upgrade_data(20220803, data(&["Ore@1.5:2"]));
        // Precision re-encode does not run; only the namespace prefix.
        assert_eq!(out.dismissed, ["M:Ore@1.5:2"]);
    }

    #[test]
    fn post_chain_versions_pass_through() {
        let original = data(&["M:Ore@1.500:2.000"]);
        assert_eq!(upgrade_data(20220929, original.clone()), original);
        assert_eq!(upgrade_data(20221114, original.clone()), original);
    }

    #[test]
    fn unparseable_ids_survive_the_reencode() {
        let out = upgrade_data(20220713, data(&["Ore@a:b", "plain"]));
        assert_eq!(out.dismissed, ["M:Ore@a:b", "M:plain"]);
    }
}
