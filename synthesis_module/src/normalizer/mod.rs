//! Text normalization for raw mail bodies.
//!
//! Cleaning is an ordered list of named [`Stage`]s. Basic mode runs
//! [`BASIC_STAGES`]; aggressive mode runs them followed by
//! [`AGGRESSIVE_STAGES`], meant for mailbox files whose text was decoded with
//! the wrong code page.
//!
//! The stage list is applied repeatedly until the text stops changing.
//! Decoding an entity or removing a fragment can expose something an earlier
//! stage would have removed. Every value `clean` returns is such a fixpoint,
//! which is what makes `clean(clean(x)) == clean(x)`.
//!
//! `clean` never fails. When the stages strip nearly everything from a
//! non-trivial input, the content is recovered from the input's word-like
//! tokens instead, and those tokens are run to a fixpoint as well.

mod markup;

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Upper bound on stage passes. Real input settles in two or three.
pub const MAX_PASSES: usize = 32;

/// Maximum number of tokens kept by the recovery fallback.
pub const FALLBACK_TOKEN_LIMIT: usize = 30;

const FALLBACK_MIN_OUTPUT_CHARS: usize = 10;
const FALLBACK_MIN_INPUT_CHARS: usize = 20;

/// Suffix appended by [`truncate_with_ellipsis`].
pub const ELLIPSIS: &str = "...";

/// One named transformation in the cleaning pipeline.
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

pub const BASIC_STAGES: &[Stage] = &[
    Stage { name: "html_document", apply: html_document },
    Stage { name: "entities", apply: decode_entities },
    Stage { name: "vml_styles", apply: strip_vml_styles },
    Stage { name: "markup_tags", apply: strip_markup_tags },
    Stage { name: "invalid_chars", apply: strip_invalid_chars },
    Stage { name: "external_banner", apply: strip_external_banner },
    Stage { name: "quoted_headers", apply: strip_quoted_headers },
    Stage { name: "quoted_lines", apply: strip_quoted_lines },
    Stage { name: "signatures", apply: strip_signatures },
    Stage { name: "separators", apply: strip_separator_rules },
    Stage { name: "whitespace", apply: collapse_whitespace },
];

pub const AGGRESSIVE_STAGES: &[Stage] = &[
    Stage { name: "rtf_escapes", apply: strip_rtf_escapes },
    Stage { name: "foreign_blocks", apply: strip_foreign_blocks },
    Stage { name: "whitelist", apply: whitelist_filter },
    Stage { name: "mixed_script_tokens", apply: drop_mixed_script_tokens },
    Stage { name: "entity_remnants", apply: strip_entity_remnants },
    Stage { name: "whitespace", apply: collapse_whitespace },
];

/// Cleans a raw message body. Total and idempotent on its own output.
pub fn clean(text: &str, aggressive: bool) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let stable = stabilize(text, aggressive);
    if stable.chars().count() < FALLBACK_MIN_OUTPUT_CHARS
        && text.chars().count() > FALLBACK_MIN_INPUT_CHARS
    {
        // Joined onto one line the tokens can meet other stages, so they
        // go through the passes too.
        let recovered = stabilize(&recover_word_tokens(text), aggressive);
        if !recovered.is_empty() {
            return recovered;
        }
    }
    stable
}

/// Runs the stage list until the text stops changing.
fn stabilize(text: &str, aggressive: bool) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_PASSES {
        let next = run_pass(&current, aggressive);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn run_pass(text: &str, aggressive: bool) -> String {
    let mut out = apply_stages(text, BASIC_STAGES);
    if aggressive {
        out = apply_stages(&out, AGGRESSIVE_STAGES);
    }
    out
}

/// Applies `stages` once, in order.
pub fn apply_stages(text: &str, stages: &[Stage]) -> String {
    stages
        .iter()
        .fold(text.to_string(), |acc, stage| (stage.apply)(&acc))
}

/// Caps `text` at `max_chars` characters, marking the cut with [`ELLIPSIS`].
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((end, _)) => format!("{}{}", &text[..end], ELLIPSIS),
    }
}

/// Joins all lines into one, for single-cell report fields.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

static FALLBACK_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[а-яА-ЯіІїЇєЄґҐa-zA-Z]{3,}").unwrap());

fn recover_word_tokens(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| FALLBACK_WORD.is_match(token))
        .take(FALLBACK_TOKEN_LIMIT)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Basic stages
// ---------------------------------------------------------------------------

fn html_document(text: &str) -> String {
    if markup::looks_like_html_document(text) {
        markup::html_to_text(text)
    } else {
        text.to_string()
    }
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(nbsp|lt|gt|amp|quot|apos|#\d{1,7}|#x[0-9a-f]{1,6});").unwrap()
});

/// Decodes until no entity is left, so `&amp;amp;lt;` becomes `<`. Every
/// replacement shortens the text, which bounds the loop.
fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    while ENTITY.is_match(&current) {
        current = decode_entities_once(&current);
    }
    current
}

fn decode_entities_once(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].to_ascii_lowercase();
            match name.as_str() {
                "nbsp" => " ".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "amp" => "&".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                numeric => decode_numeric_entity(numeric),
            }
        })
        .into_owned()
}

fn decode_numeric_entity(numeric: &str) -> String {
    let digits = &numeric[1..];
    let code = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => digits.parse::<u32>().ok(),
    };
    match code.and_then(char::from_u32) {
        Some(ch) if !ch.is_control() => ch.to_string(),
        _ => " ".to_string(),
    }
}

static VML_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // v\:* {behavior:url(#default#VML);}
        Regex::new(r"(?i)[vow]\\:\*\s*\{[^}]*\}").unwrap(),
        Regex::new(r"(?i)\.shape\s*\{[^}]*\}").unwrap(),
        Regex::new(r"(?i)\{behavior:url\([^)]*\);\}").unwrap(),
        Regex::new(r"(?i)behavior:\s*url\([^)]*\)").unwrap(),
        Regex::new(r"(?i)[vow]\\:\*").unwrap(),
        Regex::new(r"(?i)[a-z]\\:").unwrap(),
    ]
});

fn strip_vml_styles(text: &str) -> String {
    replace_all_with(text, &VML_PATTERNS, "")
}

static BLOCK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap(),
        Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap(),
        Regex::new(r"(?s)<!--.*?-->").unwrap(),
    ]
});

static LINE_BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(?:p|div|tr|li|h[1-6])\s*>").unwrap());

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9:_-]*(?:\s[^<>]*)?/?>").unwrap());

fn strip_markup_tags(text: &str) -> String {
    let without_blocks = replace_all_with(text, &BLOCK_PATTERNS, "");
    let with_breaks = LINE_BREAK_TAG.replace_all(&without_blocks, "\n");
    INLINE_TAG.replace_all(&with_breaks, " ").into_owned()
}

fn strip_invalid_chars(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .chars()
        .filter(|ch| match ch {
            '\n' | '\t' => true,
            // U+FFFD is what a lossy decode leaves behind for broken surrogates.
            '\u{FFFD}' | '\u{FEFF}' | '\u{200B}'..='\u{200D}' => false,
            ch if ch.is_control() => false,
            _ => true,
        })
        .collect()
}

static EXTERNAL_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)УВАГА!\s*[–-]\s*Зовнішній лист:.*?не очікували цього листа\.\s*").unwrap()
});

fn strip_external_banner(text: &str) -> String {
    EXTERNAL_BANNER.replace_all(text, "").into_owned()
}

static QUOTED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:From|Sent|To|Cc|Subject|Від|Надіслано|Кому|Копія|Тема)[ \t]*:[^\n]*(?:\n|$)",
    )
    .unwrap()
});

fn strip_quoted_headers(text: &str) -> String {
    QUOTED_HEADER.replace_all(text, "").into_owned()
}

static QUOTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[^\n]*(?:\n|$)").unwrap());

fn strip_quoted_lines(text: &str) -> String {
    QUOTED_LINE.replace_all(text, "").into_owned()
}

// Order matters: the "Name Surname | Title" line must go before bare titles.
static SIGNATURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Phone\s*:\s*\+?[\d \t()-]+").unwrap(),
        Regex::new(r"(?i)Email\s*:\s*[\w.+-]+@[\w.-]+").unwrap(),
        Regex::new(r"(?i)Website\s*:\s*[\w.:/-]+").unwrap(),
        Regex::new(r"(?i)тел\.?\s*внутрішній\s*:\s*\d+").unwrap(),
        Regex::new(r"(?i)моб\.?\s*тел\.?\s*:\s*\+?[\d \t()-]+").unwrap(),
        Regex::new(r"(?i)тел\.?\s*:\s*\+?[\d \t()-]+").unwrap(),
        Regex::new(
            r"(?i)\b(?:Dmytro_Sandul|Dmytro|Nikita|Молойко|Руденко|Міщевський|Антушевич|Дмитренко|Мохамед|Лур'є)\b[^\n]*",
        )
        .unwrap(),
        Regex::new(
            r"[A-Z][a-z]+[ \t]+[A-Z][a-z]+[ \t]*\|[ \t]*[\w \t]*(?i:Manager|Developer|Head|Керівник|Менеджер)[^\n]*",
        )
        .unwrap(),
        Regex::new(r"(?i)Technical\s+Support\s+Manager").unwrap(),
        Regex::new(r"(?i)Головний\s+фахівець[^\n]*").unwrap(),
        Regex::new(r"(?i)\b(?:Manager|Developer|Head|Керівник|Менеджер|фахівець)\b").unwrap(),
        Regex::new(r"(?im)^[ \t]*(?:З повагою|Best regards|Kind regards)\b[^\n]*(?:\n[^\n]*)?")
            .unwrap(),
    ]
});

fn strip_signatures(text: &str) -> String {
    replace_all_with(text, &SIGNATURE_PATTERNS, "")
}

static SEPARATOR_RULES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{5,}|={5,}|-{5,}").unwrap());

fn strip_separator_rules(text: &str) -> String {
    SEPARATOR_RULES.replace_all(text, "").into_owned()
}

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static LINE_EDGE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ +| +$").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_whitespace(text: &str) -> String {
    let spaced = HORIZONTAL_SPACE.replace_all(text, " ");
    let edged = LINE_EDGE_SPACE.replace_all(&spaced, "");
    BLANK_LINES.replace_all(&edged, "\n\n").trim().to_string()
}

// ---------------------------------------------------------------------------
// Aggressive stages
// ---------------------------------------------------------------------------

static RTF_ESCAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"\\u-?\d{1,5}\??").unwrap(),
        Regex::new(r"(?i)\\'[0-9a-f]{2}").unwrap(),
        Regex::new(r"(?i)\\x[0-9a-f]{2}").unwrap(),
        Regex::new(r"\\[a-z]{1,32}-?\d*").unwrap(),
    ]
});

fn strip_rtf_escapes(text: &str) -> String {
    replace_all_with(text, &RTF_ESCAPES, "")
}

static FOREIGN_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\u{4E00}-\u{9FFF}\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{AC00}-\u{D7AF}",
        r"\u{0080}-\u{024F}\u{0370}-\u{03FF}\u{0590}-\u{05FF}\u{0600}-\u{06FF}",
        r"\u{0900}-\u{097F}\u{0A00}-\u{0DFF}\u{1000}-\u{109F}\u{1100}-\u{11FF}",
        r"\u{1200}-\u{137F}\u{1400}-\u{167F}\u{1680}-\u{169F}]",
    ))
    .unwrap()
});

fn strip_foreign_blocks(text: &str) -> String {
    FOREIGN_BLOCKS.replace_all(text, "").into_owned()
}

fn is_ukrainian_cyrillic(ch: char) -> bool {
    matches!(ch, 'А'..='я' | 'Ґ' | 'ґ' | 'Є' | 'є' | 'І' | 'і' | 'Ї' | 'ї')
}

fn is_whitelisted(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || is_ukrainian_cyrillic(ch)
        || matches!(
            ch,
            ' ' | '\n'
                | '\t'
                | '.'
                | ','
                | ';'
                | ':'
                | '!'
                | '?'
                | '('
                | ')'
                | '-'
                | '_'
                | '"'
                | '\''
                | '@'
                | '/'
                | '+'
                | '='
                | '&'
                | '#'
                | '%'
                | '*'
                | '<'
                | '>'
        )
}

fn whitelist_filter(text: &str) -> String {
    text.chars().filter(|ch| is_whitelisted(*ch)).collect()
}

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

/// A token holding both Latin and Cyrillic letters is a decoding artifact;
/// the whole token is dropped.
fn drop_mixed_script_tokens(text: &str) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            let has_latin = token.chars().any(|ch| ch.is_ascii_alphabetic());
            let has_cyrillic = token.chars().any(is_ukrainian_cyrillic);
            if has_latin && has_cyrillic {
                String::new()
            } else {
                token.to_string()
            }
        })
        .into_owned()
}

static ENTITY_REMNANTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:nbsp|quot|amp|lt|gt|apos)\b").unwrap(),
            " ",
        ),
        (Regex::new(r"(?i)(?:o:p|[;:]p)>").unwrap(), ""),
    ]
});

fn strip_entity_remnants(text: &str) -> String {
    ENTITY_REMNANTS
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

fn replace_all_with(text: &str, patterns: &[Regex], replacement: &str) -> String {
    patterns.iter().fold(text.to_string(), |acc, pattern| {
        pattern.replace_all(&acc, replacement).into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDEMPOTENCE_SAMPLES: [&str; 10] = [
        "System IPS fails urgently",
        "Subject: restart now\n\n\n\n\n\n\n\n",
        "Manager stop\nSubject: hello world",
        "x &amp;amp;amp;amp;amp;amp;lt;b&amp;amp;amp;amp;amp;amp;gt; y",
        "Best regards\nSubject: short one here\nOk",
        "Hello&nbsp;team,&lt;b&gt;logs&lt;/b&gt; attached &amp;amp; more\n\n\n\nthanks",
        "v\\:* {behavior:url(#default#VML);}\n.shape {behavior:url(#default#VML);}\nПрошу перезапустити ESB",
        "Need access\nFrom: a@b.com\nSent: Friday, November 29, 2024 2:04 PM\nTo: c@d.com\nSubject: RE: access\n> old quoted text\nold body",
        "<html><body><p>Помилка в IPS</p><p>Phone: +380 44 123 45 67</p></body></html>",
        "Статус ntgr_статус змінено ____________ ok\u{FFFD}\u{0007}",
    ];

    #[test]
    fn stage_lists_are_named() {
        let names: Vec<&str> = BASIC_STAGES.iter().map(|stage| stage.name).collect();
        assert_eq!(names.first(), Some(&"html_document"));
        assert_eq!(names.last(), Some(&"whitespace"));
        assert_eq!(AGGRESSIVE_STAGES.last().map(|s| s.name), Some("whitespace"));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(clean("", false), "");
        assert_eq!(clean("   \n\t", true), "");
    }

    #[test]
    fn clean_is_idempotent_in_both_modes() {
        for sample in IDEMPOTENCE_SAMPLES {
            for aggressive in [false, true] {
                let once = clean(sample, aggressive);
                let twice = clean(&once, aggressive);
                assert_eq!(once, twice, "sample {sample:?}, aggressive {aggressive}");
            }
        }
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            decode_entities("a&nbsp;b &lt;x&gt; &quot;q&quot; &#1055; &#x41;"),
            "a b <x> \"q\" П A"
        );
        assert_eq!(decode_entities("&#7;"), " ");
    }

    #[test]
    fn decodes_nested_entities_in_one_stage() {
        assert_eq!(decode_entities("&amp;amp;amp;lt;"), "<");
        let nested = "x &amp;amp;amp;amp;amp;amp;lt;b&amp;amp;amp;amp;amp;amp;gt; y";
        assert_eq!(decode_entities(nested), "x <b> y");
        assert_eq!(clean(nested, false), "x y");
        assert_eq!(clean(nested, true), "x y");
    }

    #[test]
    fn strips_vml_declarations() {
        let out = strip_vml_styles("v\\:* {behavior:url(#default#VML);} o\\:* text .shape {x}");
        assert_eq!(out.split_whitespace().collect::<Vec<_>>(), vec!["text"]);
    }

    #[test]
    fn strips_tags_and_style_blocks() {
        let out = strip_markup_tags("<style>p{color:red}</style><b>bold</b><br>next a < b");
        assert_eq!(out, " bold \nnext a < b");
    }

    #[test]
    fn strips_control_and_replacement_chars() {
        assert_eq!(strip_invalid_chars("a\u{0}b\u{FFFD}c\r\nd\u{0007}"), "abc\nd");
    }

    #[test]
    fn strips_quoted_header_lines_only() {
        let text = "Please restart\nFrom: ops@x.com\nSent: today\nTo: me\nCc: you\nSubject: hi\nbody";
        assert_eq!(strip_quoted_headers(text), "Please restart\nbody");
        assert_eq!(strip_quoted_headers("Send it to: me"), "Send it to: me");
    }

    #[test]
    fn strips_signature_fragments() {
        let text = "Done.\nPhone: +380 (44) 123-45-67\nEmail: a.b@corp.com\nWebsite: https://corp.com\nDmytro Sandul\nTechnical Support Manager";
        assert_eq!(collapse_whitespace(&strip_signatures(text)), "Done.");
    }

    #[test]
    fn strips_pipe_signature_line() {
        let text = "Ok\nIvan Petrenko | Senior Manager, Corp";
        assert_eq!(collapse_whitespace(&strip_signatures(text)), "Ok");
    }

    #[test]
    fn collapses_separators_and_whitespace() {
        let text = "a  \t b\n\n\n\n_____\n=====\n-----\nc";
        let out = collapse_whitespace(&strip_separator_rules(text));
        assert_eq!(out, "a b\n\nc");
    }

    #[test]
    fn aggressive_drops_mixed_script_token_entirely() {
        let text = "Статус ntgr_статус змінено";
        assert_eq!(clean(text, true), "Статус змінено");
        assert_eq!(clean(text, false), "Статус ntgr_статус змінено");
    }

    #[test]
    fn basic_only_normalizes_whitespace_around_mixed_tokens() {
        assert_eq!(clean("  ntgr_статус   ok ", false), "ntgr_статус ok");
    }

    #[test]
    fn aggressive_drops_cjk_and_foreign_scripts() {
        assert_eq!(clean("Error 漢字 in ESB αβγ", true), "Error in ESB");
    }

    #[test]
    fn aggressive_strips_rtf_and_entity_remnants() {
        assert_eq!(
            clean("\\par Restart \\u1234 done nbsp now o:p>", true),
            "Restart done now"
        );
    }

    #[test]
    fn fallback_recovers_words_when_everything_is_stripped() {
        // Header lines go, leaving too little of a long body.
        let text = "Pls fix\nFrom: someone@corp.com\nTo: team";
        for aggressive in [false, true] {
            let out = clean(text, aggressive);
            assert_eq!(out, "Pls fix From: someone@corp.com team");
            assert_eq!(clean(&out, aggressive), out);
        }
    }

    #[test]
    fn fallback_output_goes_through_the_stages() {
        // The recovered tokens are cleaned again, so the title word goes.
        let text = "Manager stop\nSubject: hello world";
        assert_eq!(clean(text, false), "stop Subject: hello world");
        assert_eq!(clean("stop Subject: hello world", false), "stop Subject: hello world");
    }

    #[test]
    fn fallback_that_strips_to_nothing_keeps_stage_result() {
        let text = "Subject: restart now\n\n\n\n\n\n\n\n";
        for aggressive in [false, true] {
            assert_eq!(clean(text, aggressive), "");
        }
    }

    #[test]
    fn fallback_not_used_for_short_inputs() {
        assert_eq!(clean("To: x", false), "");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_with_ellipsis("Привіт світ", 6), "Привіт...");
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("exact", 5), "exact");
    }

    #[test]
    fn single_line_joins_lines() {
        assert_eq!(single_line("a\n\nb  c\n"), "a b c");
    }
}
