//! Character reference decoding.
//!
//! Covers the XML built-ins, numeric references and the named HTML entities
//! that show up in generated content. Unknown names are kept verbatim.

/// Decode a reference body (the part between `&` and `;`).
pub(super) fn decode_reference(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let code = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map_or_else(|| format!("&{name};"), |c| c.to_string());
    }

    named(name).map_or_else(|| format!("&{name};"), str::to_owned)
}

fn named(name: &str) -> Option<&'static str> {
    Some(match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        "nbsp" => "\u{00a0}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00b7}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{00b0}",
        "times" => "\u{00d7}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "euro" => "\u{20ac}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_builtins() {
        assert_eq!(decode_reference("lt"), "<");
        assert_eq!(decode_reference("amp"), "&");
    }

    #[test]
    fn test_numeric() {
        assert_eq!(decode_reference("#65"), "A");
        assert_eq!(decode_reference("#x2014"), "\u{2014}");
        assert_eq!(decode_reference("#xZZ"), "&#xZZ;");
    }

    #[test]
    fn test_named_html() {
        assert_eq!(decode_reference("nbsp"), "\u{00a0}");
        assert_eq!(decode_reference("unknown"), "&unknown;");
    }
}
