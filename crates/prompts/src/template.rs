/// Substitute `{{key}}` placeholders in one pass.
///
/// Values are inserted literally, so a value that itself contains
/// `{{...}}` is never expanded. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// `₹` amount with thousands separators, e.g. `₹1,250,000`.
pub fn format_rupees(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let out = render("Hi {{name}}, from {{ city }}.", &[("name", "Sara"), ("city", "Pune")]);
        assert_eq!(out, "Hi Sara, from Pune.");
    }

    #[test]
    fn leaves_unknown_and_unterminated_placeholders() {
        assert_eq!(render("{{other}} x", &[("name", "a")]), "{{other}} x");
        assert_eq!(render("tail {{name", &[("name", "a")]), "tail {{name");
    }

    #[test]
    fn values_are_not_re_expanded() {
        let out = render("{{a}} {{b}}", &[("a", "{{b}}"), ("b", "B")]);
        assert_eq!(out, "{{b}} B");
    }

    #[test]
    fn rupees_grouping() {
        assert_eq!(format_rupees(500), "₹500");
        assert_eq!(format_rupees(500_000), "₹500,000");
        assert_eq!(format_rupees(1_250_000), "₹1,250,000");
    }
}
