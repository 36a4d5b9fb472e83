//! Extraction of a numeric reading from recognition-service text.

use regex::Regex;
use std::sync::OnceLock;

/// First numeric token (integer or decimal) in `text`, if any.
///
/// The recognition service replies with free text; the reading is whatever
/// number appears first. `None` means no usable reading, which the caller
/// treats as data rather than an error.
pub fn first_number(text: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| {
        Regex::new(r"\d+(\.\d+)?").expect("number pattern is valid")
    });

    re.find(text).and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_integer_reading() {
        assert_eq!(first_number("The meter shows 128."), Some(128.0));
    }

    #[test]
    fn extracts_decimal_reading() {
        assert_eq!(first_number("reading: 1042.7 cubic meters"), Some(1042.7));
    }

    #[test]
    fn first_of_several_numbers_wins() {
        assert_eq!(first_number("12 then 34 then 56"), Some(12.0));
        assert_eq!(first_number("value 3.14 or 2.72"), Some(3.14));
    }

    #[test]
    fn no_number_yields_none() {
        assert_eq!(first_number("no reading visible"), None);
        assert_eq!(first_number(""), None);
    }

    #[test]
    fn number_embedded_in_words_is_still_found() {
        assert_eq!(first_number("approx128units"), Some(128.0));
    }

    #[test]
    fn leading_zeroes_parse() {
        assert_eq!(first_number("007"), Some(7.0));
    }
}
