//! Unknown-key detection for config files.
//!
//! The raw TOML is parsed into a `toml::Value` first and its dotted key
//! paths are compared against the known field names. Anything unrecognised
//! becomes a warning, with a "did you mean?" suggestion when a known key is
//! within a small edit distance. Warnings never stop a config from loading.

use std::collections::HashSet;

/// Largest edit distance that still produces a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A non-fatal config warning.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `AppConfig`.
///
/// Kept in step with the structs in app_config.rs by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        // [acquisition]
        "acquisition",
        "acquisition.sample_rate",
        "acquisition.samples_per_cycle",
        "acquisition.interval_ms",
        "acquisition.queue_capacity",
        // [network]
        "network",
        "network.target_url",
        "network.timeout_secs",
        // [output]
        "output",
        "output.mode",
        "output.directory",
        // [simulation]
        "simulation",
        "simulation.circuit",
        "simulation.spectra_count",
        "simulation.batch_size",
        "simulation.max_spectra",
    ]
    .into_iter()
    .collect()
}

/// Collect every dotted key path in a TOML tree, tables included.
///
/// `{ a = { b = 1 } }` yields `["a", "a.b"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        if v.is_table() {
            let nested = walk_toml_keys(v, &path);
            keys.push(path);
            keys.extend(nested);
        } else {
            keys.push(path);
        }
    }
    keys
}

/// Levenshtein edit distance over Unicode scalar values.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Closest known key within the suggestion distance, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Warnings for every unknown key in a raw TOML document.
///
/// Unparseable input yields no warnings; the typed parse reports it.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            suggestion: suggest_correction(&key, &known),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("rate", "rate"), 0);
        assert_eq!(levenshtein("sample_rte", "sample_rate"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let value: toml::Value = r#"
            [acquisition]
            sample_rate = 10.0
            [output]
            mode = "csv"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&value, "");
        for expected in [
            "acquisition",
            "acquisition.sample_rate",
            "output",
            "output.mode",
        ] {
            assert!(keys.contains(&expected.to_string()), "missing {expected}");
        }
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_typo_key_gets_suggestion() {
        let warnings = validate_unknown_keys("[acquisition]\nsample_rte = 500.0\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "acquisition.sample_rte");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("acquisition.sample_rate")
        );
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_valid_keys_produce_no_warnings() {
        let raw = r#"
[acquisition]
sample_rate = 200000.0
interval_ms = 500

[network]
target_url = "http://localhost:9000/eis-data"

[simulation]
circuit = "medium"
"#;
        let warnings = validate_unknown_keys(raw);
        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_without_close_match() {
        let warnings = validate_unknown_keys("[telemetry_export]\nenabled = true\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_garbage_input_is_left_to_parser() {
        assert!(validate_unknown_keys("this is = = not toml").is_empty());
    }

    #[test]
    fn test_known_keys_cover_every_section() {
        let known = known_config_keys();
        for section in ["acquisition", "network", "output", "simulation"] {
            assert!(known.contains(section));
        }
        assert!(known.contains("simulation.max_spectra"));
    }
}
