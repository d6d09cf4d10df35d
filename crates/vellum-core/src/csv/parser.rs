//! Tabular text parsing for the CSV fallback.

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Parse comma-delimited text into rows of fields.
///
/// Quoted fields may contain delimiters and row breaks; a doubled quote
/// inside a quoted field is a literal quote. Rows end at LF, CR, or
/// CRLF. A trailing row break does not produce an empty row.
pub(crate) fn parse_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            QUOTE if field.is_empty() => in_quotes = true,
            DELIMITER => row.push(std::mem::take(&mut field)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_row(&mut rows, &mut row, &mut field);
            }
            '\n' => end_row(&mut rows, &mut row, &mut field),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

fn end_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rows() {
        assert_eq!(
            parse_rows("a,b\n1,2\n").unwrap(),
            vec![vec!["a", "b"], vec!["1", "2"]]
        );
    }

    #[test]
    fn test_crlf_and_bare_cr_rows() {
        assert_eq!(
            parse_rows("a,b\r\n1,2\r3,4").unwrap(),
            vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]
        );
    }

    #[test]
    fn test_quoted_fields_keep_delimiters_and_breaks() {
        assert_eq!(
            parse_rows("\"a,b\",\"1\n2\"\n").unwrap(),
            vec![vec!["a,b", "1\n2"]]
        );
    }

    #[test]
    fn test_doubled_quote_is_literal() {
        assert_eq!(
            parse_rows("\"say \"\"hi\"\"\",x\n").unwrap(),
            vec![vec!["say \"hi\"", "x"]]
        );
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        assert!(parse_rows("\"open,field\nnever closed").is_err());
    }

    #[test]
    fn test_no_trailing_empty_row() {
        assert_eq!(parse_rows("a\n").unwrap(), vec![vec!["a"]]);
        assert_eq!(parse_rows("").unwrap(), Vec::<Vec<String>>::new());
    }

    #[test]
    fn test_empty_fields_survive() {
        assert_eq!(
            parse_rows("a,,c\n,,\n").unwrap(),
            vec![vec!["a", "", "c"], vec!["", "", ""]]
        );
    }
}
