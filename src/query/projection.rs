//! LABELS / REDACT projection
//!
//! Projection filters a record's ordered field list without ever reordering
//! it: `Include` keeps only the listed names, `Exclude` keeps everything but
//! the listed names. The two are mutually exclusive in one query; the option
//! parser enforces that.

/// Projection mode of a query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// No projection: all fields pass through
    #[default]
    None,
    /// `LABELS name+`: keep only the listed fields
    Include(Vec<String>),
    /// `REDACT name+`: drop the listed fields
    Exclude(Vec<String>),
}

impl Projection {
    /// True when no projection is configured
    pub fn is_none(&self) -> bool {
        matches!(self, Projection::None)
    }

    /// Apply to an ordered field list, preserving the surviving order
    pub fn apply(&self, fields: Vec<(String, String)>) -> Vec<(String, String)> {
        match self {
            Projection::None => fields,
            Projection::Include(names) => fields
                .into_iter()
                .filter(|(name, _)| names.iter().any(|n| n == name))
                .collect(),
            Projection::Exclude(names) => fields
                .into_iter()
                .filter(|(name, _)| !names.iter().any(|n| n == name))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Vec<(String, String)> {
        [
            ("id", "7"),
            ("name", "ada"),
            ("last_name", "lovelace"),
            ("coolness", "max"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_include_keeps_original_order() {
        // listed out of record order on purpose
        let p = Projection::Include(vec!["last_name".to_string(), "name".to_string()]);
        let out = p.apply(record());
        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "last_name"]);
    }

    #[test]
    fn test_exclude_preserves_the_rest() {
        let p = Projection::Exclude(vec!["id".to_string(), "coolness".to_string()]);
        let out = p.apply(record());
        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["name", "last_name"]);
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(Projection::None.apply(record()), record());
    }

    #[test]
    fn test_include_of_unknown_names_yields_empty() {
        let p = Projection::Include(vec!["ghost".to_string()]);
        assert!(p.apply(record()).is_empty());
    }
}
