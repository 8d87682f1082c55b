//! Occupation (ROME) catalog: code → description, plus URL slug lookups.

use ahash::AHashMap as HashMap;

/// Turn a human-readable label into the URL slug form used throughout the
/// request surface, e.g. `"Comptabilité"` → `"comptabilite"`.
///
/// Lowercases, folds the accented characters that occur in occupation and
/// city labels, and collapses every other non-alphanumeric run into a single
/// dash.
#[must_use]
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;

    let mut push = |c: char, slug: &mut String| {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    };

    for c in label.chars() {
        match fold_char(c) {
            Some(folded) => folded.chars().for_each(|f| push(f, &mut slug)),
            None => push(c, &mut slug),
        }
    }
    slug
}

/// Fold one accented character to its ASCII base form(s).
fn fold_char(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'â' | 'ä' | 'á' | 'À' | 'Â' | 'Ä' | 'Á' => "a",
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => "e",
        'î' | 'ï' | 'Î' | 'Ï' => "i",
        'ô' | 'ö' | 'ó' | 'Ô' | 'Ö' | 'Ó' => "o",
        'ù' | 'û' | 'ü' | 'Ù' | 'Û' | 'Ü' => "u",
        'ç' | 'Ç' => "c",
        'œ' | 'Œ' => "oe",
        'æ' | 'Æ' => "ae",
        _ => return None,
    })
}

/// Catalog of occupation codes and their human-readable descriptions.
///
/// Slugs are derived from the descriptions at construction time so that both
/// `code → description` and `slug → code` lookups are O(1) afterwards.
#[derive(Debug, Clone, Default)]
pub struct OccupationCatalog {
    descriptions: HashMap<String, String>,
    by_slug: HashMap<String, String>,
}

impl OccupationCatalog {
    #[must_use]
    pub fn new(descriptions: std::collections::HashMap<String, String>) -> Self {
        let descriptions: HashMap<String, String> = descriptions.into_iter().collect();
        let by_slug = descriptions
            .iter()
            .map(|(code, label)| (slugify(label), code.clone()))
            .collect();
        Self {
            descriptions,
            by_slug,
        }
    }

    /// Description for an occupation code, if the code is in the catalog.
    #[must_use]
    pub fn description(&self, code: &str) -> Option<&str> {
        self.descriptions.get(code).map(String::as_str)
    }

    /// Occupation code for a slugified description, e.g. `"comptabilite"`.
    #[must_use]
    pub fn code_for_slug(&self, slug: &str) -> Option<&str> {
        self.by_slug.get(slug).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.descriptions.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Comptabilité"), "comptabilite");
        assert_eq!(
            slugify("Études et développement informatique"),
            "etudes-et-developpement-informatique"
        );
        assert_eq!(slugify("Nettoyage de locaux"), "nettoyage-de-locaux");
        assert_eq!(slugify("Paris 10e Arrondissement"), "paris-10e-arrondissement");
        assert_eq!(slugify("  --  "), "");
        assert_eq!(slugify("Chœur / œuvre"), "choeur-oeuvre");
    }

    #[test]
    fn slug_lookup_matches_description() {
        let mut raw = std::collections::HashMap::new();
        raw.insert("M1203".to_string(), "Comptabilité".to_string());
        raw.insert(
            "M1805".to_string(),
            "Études et développement informatique".to_string(),
        );
        let catalog = OccupationCatalog::new(raw);

        assert_eq!(catalog.code_for_slug("comptabilite"), Some("M1203"));
        assert_eq!(
            catalog.code_for_slug("etudes-et-developpement-informatique"),
            Some("M1805")
        );
        assert_eq!(catalog.code_for_slug("boulangerie"), None);
        assert!(catalog.contains("M1203"));
        assert_eq!(catalog.len(), 2);
    }
}
