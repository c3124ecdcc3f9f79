//! Station name normalization.

/// Reduce a station name to the form used for cross-provider matching.
///
/// Lowercases, folds `ё` to `е` and `й` to `и`, drops hard and soft signs,
/// turns everything that is not a Russian or Latin letter or a digit into a
/// space, then collapses whitespace.
///
/// # Examples
///
/// ```
/// use bus_aggregator::reconcile::normalize_name;
///
/// assert_eq!(normalize_name("Южно-Сахалинск"), "южно сахалинск");
/// assert_eq!(normalize_name("  Ёлкино (АВ) "), "елкино ав");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'ё' => 'е',
            'й' => 'и',
            'ъ' | 'ь' => continue,
            'а'..='я' | 'a'..='z' | '0'..='9' => c,
            _ => ' ',
        };
        if c == ' ' && (out.is_empty() || out.ends_with(' ')) {
            continue;
        }
        out.push(c);
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn folds_letters_and_punctuation() {
        assert_eq!(normalize_name("Южно-Сахалинск"), "южно сахалинск");
        assert_eq!(normalize_name("южно сахалинск"), "южно сахалинск");
        assert_eq!(normalize_name("Подъезд"), "подезд");
        assert_eq!(normalize_name("Тайга"), "таига");
        assert_eq!(normalize_name("Ногликский р-н, АВ №2"), "ногликскии р н ав 2");
        assert_eq!(normalize_name("Bus Station 1"), "bus station 1");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" - . "), "");
    }

    proptest! {
        /// Normalizing twice gives the same result as normalizing once
        #[test]
        fn idempotent(name in "\\PC{0,40}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once);
        }

        /// Output never has leading, trailing, or doubled spaces
        #[test]
        fn whitespace_collapsed(name in "[ а-яА-ЯёЁa-zA-Z0-9.,()-]{0,40}") {
            let out = normalize_name(&name);
            prop_assert!(!out.starts_with(' '));
            prop_assert!(!out.ends_with(' '));
            prop_assert!(!out.contains("  "));
        }

        /// Case and punctuation differences never affect the result
        #[test]
        fn insensitive_to_case_and_hyphens(word_a in "[а-я]{1,10}", word_b in "[а-я]{1,10}") {
            let hyphenated = format!("{}-{}", word_a.to_uppercase(), word_b);
            let spaced = format!("{} {}", word_a, word_b.to_uppercase());
            prop_assert_eq!(normalize_name(&hyphenated), normalize_name(&spaced));
        }
    }
}
