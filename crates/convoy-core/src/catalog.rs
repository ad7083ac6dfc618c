//! Catalog diff: which applications a robot still needs.

use crate::types::{Application, InstalledAppRef};

/// Returns every catalog application the robot does not hold at the exact
/// catalog version.
///
/// A missing app and a version mismatch both count as needing install; an
/// empty installed set yields the full catalog.
pub fn apps_needing_install(
    catalog: &[Application],
    installed: &[InstalledAppRef],
) -> Vec<Application> {
    catalog
        .iter()
        .filter(|app| {
            !installed
                .iter()
                .any(|held| held.app_id == app.app_id && held.version == app.version)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(app_id: &str, version: &str) -> Application {
        Application {
            app_id: app_id.to_string(),
            name: format!("{app_id}-name"),
            version: version.to_string(),
            url: format!("https://store.example/{app_id}/{version}.pkg"),
        }
    }

    fn held(app_id: &str, version: &str) -> InstalledAppRef {
        InstalledAppRef {
            app_id: app_id.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn empty_installed_set_yields_full_catalog() {
        let catalog = vec![app("x", "1.0"), app("y", "2.0")];
        let diff = apps_needing_install(&catalog, &[]);
        assert_eq!(diff, catalog);
    }

    #[test]
    fn exact_match_is_excluded() {
        let catalog = vec![app("x", "1.0"), app("y", "2.0")];
        let diff = apps_needing_install(&catalog, &[held("x", "1.0")]);
        assert_eq!(diff, vec![app("y", "2.0")]);
    }

    #[test]
    fn version_mismatch_counts_as_needing_install() {
        let catalog = vec![app("x", "1.0"), app("y", "2.0")];
        let diff = apps_needing_install(&catalog, &[held("x", "0.9")]);
        assert_eq!(diff, vec![app("x", "1.0"), app("y", "2.0")]);
    }

    #[test]
    fn fully_installed_robot_gets_nothing() {
        let catalog = vec![app("x", "1.0")];
        let diff = apps_needing_install(&catalog, &[held("x", "1.0"), held("y", "2.0")]);
        assert!(diff.is_empty());
    }
}
