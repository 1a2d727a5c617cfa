/// A diagnostic class the pipeline always reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisClass {
    pub code: &'static str,
    pub display_name: &'static str,
}

/// The fixed class catalog, in declaration order. Result ties are broken by
/// this order.
pub const CATALOG: [DiagnosisClass; 7] = [
    DiagnosisClass { code: "MEL", display_name: "Melanoma" },
    DiagnosisClass { code: "NV", display_name: "Nevus" },
    DiagnosisClass { code: "BCC", display_name: "Basal cell carcinoma" },
    DiagnosisClass { code: "AK", display_name: "Actinic keratosis" },
    DiagnosisClass { code: "BKL", display_name: "Benign keratosis-like lesions" },
    DiagnosisClass { code: "DF", display_name: "Dermatofibroma" },
    DiagnosisClass { code: "VASC", display_name: "Vascular lesions" },
];

/// Code of the clinically critical class the risk tier is derived from.
pub const CRITICAL_CODE: &str = "MEL";

/// Map an upstream score key to its catalog code.
///
/// Accepts a code or a display name, both case-insensitive. Returns `None`
/// for keys outside the catalog.
pub fn resolve_key(key: &str) -> Option<&'static str> {
    let key = key.trim();
    CATALOG
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(key) || c.display_name.eq_ignore_ascii_case(key))
        .map(|c| c.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<&str> = CATALOG.iter().map(|c| c.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), CATALOG.len());
    }

    #[test]
    fn test_resolve_code_and_name() {
        assert_eq!(resolve_key("MEL"), Some("MEL"));
        assert_eq!(resolve_key("vasc"), Some("VASC"));
        assert_eq!(resolve_key("Basal cell carcinoma"), Some("BCC"));
        assert_eq!(resolve_key(" benign keratosis-like lesions "), Some("BKL"));
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(resolve_key("Seborrheic keratosis"), None);
        assert_eq!(resolve_key(""), None);
    }

    #[test]
    fn test_critical_class_in_catalog() {
        assert!(CATALOG.iter().any(|c| c.code == CRITICAL_CODE));
    }
}
