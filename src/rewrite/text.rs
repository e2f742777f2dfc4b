//! Line-oriented port patching for TOML and TOML-like configs.
//!
//! Only the digits of a recognised field are replaced; keys, spacing,
//! comments and every other byte of the file are carried over untouched.

use regex::Regex;
use std::sync::OnceLock;

/// Field names treated as ports in text mode, in the order they are applied.
pub const PORT_FIELDS: [&str; 6] = [
    "port",
    "listen_port",
    "http_port",
    "ws_port",
    "api_port",
    "server_port",
];

static QUOTED_FIELD_REGEX: OnceLock<Regex> = OnceLock::new();
static BARE_FIELD_REGEX: OnceLock<Regex> = OnceLock::new();

fn field_alternation() -> String {
    PORT_FIELDS.join("|")
}

/// `"port": 8000` and `"port" = 8000`
fn quoted_field_regex() -> &'static Regex {
    QUOTED_FIELD_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r#""(?P<key>{})"\s*[:=]\s*(?P<value>\d+)"#,
            field_alternation()
        ))
        .expect("static regex pattern is valid")
    })
}

/// `port = 8000`, `server.port=8000`, `{ port = 8000 }`
///
/// The leading group stops `mongo_port` or `admin-port` from matching as `port`.
fn bare_field_regex() -> &'static Regex {
    BARE_FIELD_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r#"(?m)(?:^|[^\w\-"])(?P<key>{})\s*=\s*(?P<value>\d+)"#,
            field_alternation()
        ))
        .expect("static regex pattern is valid")
    })
}

/// Replace the value of every recognised port field with `new_port`.
///
/// Returns the patched text and the number of values that actually changed.
pub fn rewrite_port_fields(content: &str, new_port: u16) -> (String, usize) {
    let mut changed = 0;
    let mut current = content.to_string();

    for regex in [quoted_field_regex(), bare_field_regex()] {
        let (next, n) = apply(regex, &current, new_port);
        current = next;
        changed += n;
    }

    (current, changed)
}

/// Number of recognised port fields outside comments, whatever their value.
pub fn count_port_fields(content: &str) -> usize {
    [quoted_field_regex(), bare_field_regex()]
        .into_iter()
        .flat_map(|regex| regex.captures_iter(content))
        .filter_map(|caps| caps.name("key"))
        .filter(|key| !in_comment(content, key_start(content, key.start())))
        .count()
}

fn apply(regex: &Regex, content: &str, new_port: u16) -> (String, usize) {
    let replacement = new_port.to_string();
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    let mut changed = 0;

    for caps in regex.captures_iter(content) {
        let (Some(key), Some(value)) = (caps.name("key"), caps.name("value")) else {
            continue;
        };
        if in_comment(content, key_start(content, key.start())) {
            continue;
        }
        if value.as_str() != replacement {
            tracing::debug!(
                "Port field '{}': {} -> {}",
                key.as_str(),
                value.as_str(),
                replacement
            );
            changed += 1;
        }
        out.push_str(&content[last..value.start()]);
        out.push_str(&replacement);
        last = value.end();
    }

    out.push_str(&content[last..]);
    (out, changed)
}

/// Start of the key including its opening quote, if it has one.
fn key_start(content: &str, pos: usize) -> usize {
    if content[..pos].ends_with('"') {
        pos - 1
    } else {
        pos
    }
}

/// True when a `#` outside any string precedes `pos` on the same line.
///
/// Basic strings honour `\"` escapes; literal `'...'` strings have none.
fn in_comment(content: &str, pos: usize) -> bool {
    let line_start = content[..pos].rfind('\n').map_or(0, |i| i + 1);
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in content[line_start..pos].chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '#' => return true,
                '"' | '\'' => quote = Some(c),
                _ => {}
            },
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_bare_fields() {
        let input = "port = 8000\nlisten_port = 8001\n";
        let (out, changed) = rewrite_port_fields(input, 9000);
        assert_eq!(out, "port = 9000\nlisten_port = 9000\n");
        assert_eq!(changed, 2);
    }

    #[test]
    fn rewrites_quoted_json_style_fields() {
        let input = r#"{"http_port": 80, "name": "x", "ws_port" :81}"#;
        let (out, _) = rewrite_port_fields(input, 9000);
        assert_eq!(out, r#"{"http_port": 9000, "name": "x", "ws_port" :9000}"#);
    }

    #[test]
    fn keeps_spacing_and_inline_comments() {
        let input = "[server]\nport=8000   # main port\nhost = \"0.0.0.0\"\n";
        let (out, _) = rewrite_port_fields(input, 8123);
        assert_eq!(out, "[server]\nport=8123   # main port\nhost = \"0.0.0.0\"\n");
    }

    #[test]
    fn ignores_commented_out_fields() {
        let input = "# port = 1234\nport = 8000\n";
        let (out, changed) = rewrite_port_fields(input, 9000);
        assert_eq!(out, "# port = 1234\nport = 9000\n");
        assert_eq!(changed, 1);
    }

    #[test]
    fn leaves_similar_keys_alone() {
        let input = "mongo_port = 27017\nadmin-port = 1\nports = 3\nexport = 4\nport_range = 5\n";
        let (out, changed) = rewrite_port_fields(input, 9000);
        assert_eq!(out, input);
        assert_eq!(changed, 0);
    }

    #[test]
    fn handles_inline_tables_and_dotted_keys() {
        let input = "napcat = { host = \"127.0.0.1\", port = 8095 }\nserver.api_port = 7000\n";
        let (out, changed) = rewrite_port_fields(input, 9100);
        assert_eq!(
            out,
            "napcat = { host = \"127.0.0.1\", port = 9100 }\nserver.api_port = 9100\n"
        );
        assert_eq!(changed, 2);
    }

    #[test]
    fn counts_fields_regardless_of_value() {
        let input = "# port = 1\nport = 9000\n\"api_port\": 1\nmongo_port = 2\n";
        assert_eq!(count_port_fields(input), 2);
        assert_eq!(count_port_fields("name = 1\n"), 0);
    }

    #[test]
    fn hash_inside_string_does_not_start_a_comment() {
        let input = "napcat = { name = \"bot#1\", port = 8095 }\n";
        let (out, changed) = rewrite_port_fields(input, 9100);
        assert_eq!(out, "napcat = { name = \"bot#1\", port = 9100 }\n");
        assert_eq!(changed, 1);
        assert_eq!(count_port_fields(input), 1);

        let input = "title = 'a#b' # port = 1\nlabel = \"x\\\"#\" ; port = 2\n";
        let (out, changed) = rewrite_port_fields(input, 9100);
        assert_eq!(out, "title = 'a#b' # port = 1\nlabel = \"x\\\"#\" ; port = 9100\n");
        assert_eq!(changed, 1);
    }

    #[test]
    fn json_line_with_hash_in_url_is_rewritten() {
        let input = r#"{"url": "http://h/#/x", "port": 8000}"#;
        let (out, changed) = rewrite_port_fields(input, 9100);
        assert_eq!(out, r#"{"url": "http://h/#/x", "port": 9100}"#);
        assert_eq!(changed, 1);
        assert_eq!(count_port_fields(input), 1);
    }

    #[test]
    fn commented_out_quoted_field_is_ignored() {
        let input = "# \"port\" = 1\n\"port\" = 2\n";
        let (out, changed) = rewrite_port_fields(input, 9100);
        assert_eq!(out, "# \"port\" = 1\n\"port\" = 9100\n");
        assert_eq!(changed, 1);
    }

    #[test]
    fn already_matching_value_is_not_counted() {
        let (out, changed) = rewrite_port_fields("port = 9000\n", 9000);
        assert_eq!(out, "port = 9000\n");
        assert_eq!(changed, 0);
    }
}
