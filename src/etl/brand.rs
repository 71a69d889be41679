//! Best-effort brand extraction from free-text product names.

/// Labels checked in order; the first one found anywhere in the name wins, so
/// "Dior" shadows "Christian Dior" and the order must not change.
pub const KNOWN_BRANDS: &[&str] = &[
    "Louis Vuitton",
    "Chanel",
    "Gucci",
    "Prada",
    "Hermès",
    "Fendi",
    "Bottega Veneta",
    "Saint Laurent",
    "YSL",
    "Balenciaga",
    "Celine",
    "Dior",
    "Givenchy",
    "Chloé",
    "Tory Burch",
    "MCM",
    "Furla",
    "Badgley Mischka",
    "DKNY",
    "Valentino",
    "Morroccan Oil",
    "Disney",
    "Tiffany",
    "Christian Dior",
    "Ferragamo",
];

/// Maps "brand + product name" text to a single brand label.
///
/// Known labels match case-insensitively as substrings. Failing that, a
/// capitalized first word longer than two characters is taken as the brand.
/// False positives are expected; this is a heuristic, not a parser.
#[derive(Debug, Clone)]
pub struct BrandResolver {
    known: Vec<(String, String)>,
}

impl BrandResolver {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = known
            .into_iter()
            .map(Into::into)
            .map(|label: String| (label.to_lowercase(), label))
            .collect();
        Self { known }
    }

    pub fn resolve(&self, combined_name: Option<&str>) -> Option<String> {
        let name = combined_name?.trim();
        if name.is_empty() {
            return None;
        }

        let lowered = name.to_lowercase();
        if let Some((_, label)) = self.known.iter().find(|(needle, _)| lowered.contains(needle)) {
            return Some(label.clone());
        }

        let first = name.split_whitespace().next()?;
        let starts_upper = first.chars().next().is_some_and(char::is_uppercase);
        if first.chars().count() > 2 && starts_upper {
            return Some(first.to_string());
        }

        None
    }
}

impl Default for BrandResolver {
    fn default() -> Self {
        Self::new(KNOWN_BRANDS.iter().copied())
    }
}

pub fn resolve_brand(combined_name: Option<&str>) -> Option<String> {
    BrandResolver::default().resolve(combined_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_brand_anywhere_in_the_name() {
        assert_eq!(resolve_brand(Some("Louis Vuitton Neverfull Tote")).as_deref(), Some("Louis Vuitton"));
        assert_eq!(resolve_brand(Some("vintage chanel flap bag")).as_deref(), Some("Chanel"));
        assert_eq!(resolve_brand(Some("Authentic HERMÈS scarf")).as_deref(), Some("Hermès"));
    }

    #[test]
    fn list_order_decides_between_overlapping_labels() {
        assert_eq!(resolve_brand(Some("Christian Dior Saddle")).as_deref(), Some("Dior"));

        let resolver = BrandResolver::new(["Christian Dior", "Dior"]);
        assert_eq!(resolver.resolve(Some("Christian Dior Saddle")).as_deref(), Some("Christian Dior"));
    }

    #[test]
    fn falls_back_to_capitalized_first_word() {
        assert_eq!(resolve_brand(Some("Zelnova Scarf")).as_deref(), Some("Zelnova"));
        assert_eq!(resolve_brand(Some("  Kate Spade wallet")).as_deref(), Some("Kate"));
    }

    #[test]
    fn nothing_for_short_or_lowercase_first_words() {
        assert_eq!(resolve_brand(Some("a scarf")), None);
        assert_eq!(resolve_brand(Some("No belt")), None);
        assert_eq!(resolve_brand(Some("leather belt")), None);
        assert_eq!(resolve_brand(Some("   ")), None);
        assert_eq!(resolve_brand(None), None);
    }
}
