//! Built-in run profiles embedded in the binary
//!
//! Lets users run `--profile funnel-detalle` instead of pointing at a file.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in run profile YAML definitions
pub static BUILTIN_PROFILES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // BI indicators
        m.insert("indicadores", include_str!("../profiles/indicadores.yaml"));
        m.insert(
            "indicadores20",
            include_str!("../profiles/indicadores20.yaml"),
        );
        m.insert("quickcount", include_str!("../profiles/quickcount.yaml"));

        // Funnel
        m.insert(
            "funnel-detalle",
            include_str!("../profiles/funnel-detalle.yaml"),
        );
        m.insert(
            "funnel-general",
            include_str!("../profiles/funnel-general.yaml"),
        );

        m
    });

/// Get a built-in profile by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_PROFILES.get(name).copied()
}

/// Check if a name is a built-in profile
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_PROFILES.contains_key(name)
}

/// List built-in profile names in display order
pub fn list_builtin() -> Vec<&'static str> {
    vec![
        "indicadores",
        "indicadores20",
        "quickcount",
        "funnel-detalle",
        "funnel-general",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunProfile;
    use crate::decode::RecordShape;
    use crate::types::{Method, NumericKind};

    #[test]
    fn test_every_listed_profile_is_embedded() {
        for name in list_builtin() {
            assert!(is_builtin(name), "{name} is not embedded");
        }
        assert_eq!(list_builtin().len(), BUILTIN_PROFILES.len());
    }

    #[test]
    fn test_builtin_profiles_are_valid() {
        for name in list_builtin() {
            let profile = RunProfile::load(name)
                .unwrap_or_else(|e| panic!("profile {name} failed to load: {e}"));
            assert_eq!(profile.name, name);
        }
    }

    #[test]
    fn test_quickcount_profile() {
        let profile = RunProfile::load("quickcount").unwrap();
        assert_eq!(profile.endpoint.method, Method::POST);
        assert_eq!(profile.endpoint.records, RecordShape::field("data"));
        assert!(profile.csv.enabled);
    }

    #[test]
    fn test_funnel_detalle_float_field() {
        let profile = RunProfile::load("funnel-detalle").unwrap();
        let inactive = profile
            .fields
            .iter()
            .find(|f| f.name == "prospectosinactivos")
            .unwrap();
        assert_eq!(inactive.kind, NumericKind::Float);
    }

    #[test]
    fn test_indicadores20_has_table() {
        let profile = RunProfile::load("indicadores20").unwrap();
        let table = profile.table.unwrap();
        assert_eq!(table.table, "analisisdiariobdc");
        assert_eq!(table.columns.len(), 23);
    }

    #[test]
    fn test_unknown_profile() {
        assert!(get_builtin("nope").is_none());
    }
}
