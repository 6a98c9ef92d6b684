use regex::Regex;
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static CLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static AMPM_REGEX: OnceLock<Regex> = OnceLock::new();
static LEADING_AMPM_REGEX: OnceLock<Regex> = OnceLock::new();
static SPACE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Strip markup and digital-clock noise from a quote before it is laid out.
pub fn clean_quote_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // 1. <br>, </br>, <i> ... become spaces
    let tag_re = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid tag Regex"));
    let text = tag_re.replace_all(raw, " ");

    // 2. Standalone "00:00:00" readouts
    let clock_re = CLOCK_REGEX
        .get_or_init(|| Regex::new(r"\s+\d{1,2}:\d{2}:\d{2}\s+").expect("Invalid clock Regex"));
    let text = replace_until_stable(clock_re, text.into_owned());

    // 3. Isolated "12:37 AM" readouts; ones inside a sentence stay
    let ampm_re = AMPM_REGEX.get_or_init(|| {
        Regex::new(r"\s+\d{1,2}:\d{2}\s*[AP]M(\s|$)").expect("Invalid AM/PM Regex")
    });
    let text = replace_until_stable(ampm_re, text);

    let leading_re = LEADING_AMPM_REGEX.get_or_init(|| {
        Regex::new(r"^\s*\d{1,2}:\d{2}\s*[AP]M\s*").expect("Invalid leading AM/PM Regex")
    });
    let text = leading_re.replace(&text, "");

    let space_re = SPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid space Regex"));
    space_re.replace_all(&text, " ").trim().to_string()
}

/// Both readout patterns consume the whitespace on either side, so adjacent
/// readouts share a separator. Repeat until nothing matches.
fn replace_until_stable(re: &Regex, mut text: String) -> String {
    while re.is_match(&text) {
        text = re.replace_all(&text, " ").into_owned();
    }
    text
}
