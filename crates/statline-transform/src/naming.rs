//! Canonical snake_case column names

use std::sync::LazyLock;

use regex::Regex;

static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])([a-zA-Z])").expect("invalid regex"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("invalid regex"));

/// Raw dotted/camelCase path → snake_case.
///
/// Dots become underscores; a digit followed by a letter and every
/// upper-case letter (except a leading one) start a new word; repeated
/// underscores collapse.
///
/// `incomeLevel.id` → `income_level_id`, `iso2Code` → `iso2_code`.
pub fn to_snake(name: &str) -> String {
    let name = name.replace('.', "_");
    let name = DIGIT_LETTER.replace_all(&name, "${1}_${2}");

    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }

    UNDERSCORES.replace_all(&out, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_to_underscores() {
        assert_eq!(to_snake("country.id"), "country_id");
        assert_eq!(to_snake("region.value"), "region_value");
    }

    #[test]
    fn camel_case() {
        assert_eq!(to_snake("capitalCity"), "capital_city");
        assert_eq!(to_snake("incomeLevel.id"), "income_level_id");
        assert_eq!(to_snake("sourceOrganization"), "source_organization");
    }

    #[test]
    fn digit_letter_boundary() {
        assert_eq!(to_snake("iso2Code"), "iso2_code");
        assert_eq!(to_snake("region.iso2code"), "region_iso2_code");
    }

    #[test]
    fn leading_capital_not_split() {
        assert_eq!(to_snake("Name"), "name");
    }

    #[test]
    fn consecutive_capitals_split_each() {
        assert_eq!(to_snake("GDP"), "g_d_p");
    }

    #[test]
    fn underscores_collapse() {
        assert_eq!(to_snake("obs__status"), "obs_status");
        assert_eq!(to_snake("a._B"), "a_b");
    }

    #[test]
    fn already_snake() {
        assert_eq!(to_snake("obs_status"), "obs_status");
        assert_eq!(to_snake("unit"), "unit");
    }
}
