//! Minimal CSV helpers for the trial and threshold tables
//!
//! Fields containing a comma, quote or line break are quoted with embedded
//! quotes doubled. Splitting accepts the same dialect.

/// Quote a field when needed
pub fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line (without line terminator)
pub fn join_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Group the lines of a CSV document into records
///
/// A line break inside a quoted field continues the record on the next
/// line. Each record is paired with the 1-based line it starts on.
pub fn records(contents: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start = 1;
    let mut in_quotes = false;

    for (index, line) in contents.split_inclusive('\n').enumerate() {
        if current.is_empty() {
            start = index + 1;
        }
        // Doubled quotes flip twice and leave the state unchanged
        in_quotes ^= line.matches('"').count() % 2 == 1;
        current.push_str(line);
        if !in_quotes {
            let record = std::mem::take(&mut current);
            out.push((start, record.trim_end_matches(&['\r', '\n'][..]).to_string()));
        }
    }
    if !current.is_empty() {
        out.push((start, current));
    }
    out
}

/// Split one CSV record into fields
///
/// # Errors
/// Returns a description when a quoted field is not terminated.
pub fn split_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(&['\r', '\n'][..]).chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("1234"), "1234");
        assert_eq!(escape_field("10, 5, 2"), "\"10, 5, 2\"");
        assert_eq!(escape_field("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_split_record_with_quotes() {
        let fields = split_record("1,P01,\"10, 5, 2\",\"say \"\"hi\"\"\",").unwrap();
        assert_eq!(fields, vec!["1", "P01", "10, 5, 2", "say \"hi\"", ""]);
    }

    #[test]
    fn test_join_then_split() {
        let line = join_record(["A", "x,y", ""]);
        assert_eq!(line, "A,\"x,y\",");
        assert_eq!(split_record(&line).unwrap(), vec!["A", "x,y", ""]);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(split_record("a,\"b").is_err());
    }

    #[test]
    fn test_records_keep_quoted_line_breaks() {
        let contents = "a,b\n1,\"aided\nleft\"\r\n2,x\n";
        let records = records(contents);
        assert_eq!(
            records,
            vec![
                (1, "a,b".to_string()),
                (2, "1,\"aided\nleft\"".to_string()),
                (4, "2,x".to_string()),
            ]
        );
        assert_eq!(split_record(&records[1].1).unwrap(), vec!["1", "aided\nleft"]);
    }

    #[test]
    fn test_records_unterminated_quote_runs_to_end() {
        let records = records("a\n\"b\nc\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].0, 2);
        assert!(split_record(&records[1].1).is_err());
    }

    #[test]
    fn test_crlf_trimmed() {
        assert_eq!(split_record("a,b\r\n").unwrap(), vec!["a", "b"]);
    }
}
