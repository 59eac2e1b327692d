/// Render a header plus rows as CSV text. Fields are quoted only when they
/// contain a delimiter, quote, or line break.
pub fn write_csv(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();

    push_record(&mut out, header.iter().map(|field| field.to_string()));
    for row in rows {
        push_record(&mut out, row.iter().cloned());
    }

    out
}

fn push_record(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
