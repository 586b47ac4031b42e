//! Document id templates such as `"employee-{person_id}"`.
//!
//! `{name}` is replaced by the binding `name`; `{{` and `}}` produce literal
//! braces. The expanded id still has to pass document id validation.

use std::collections::BTreeMap;

use crate::error::{DocResult, DocumentError};

/// Values available to an id template.
pub type Bindings = BTreeMap<String, String>;

fn malformed(template: &str, reason: &str) -> DocumentError {
    DocumentError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand `template` with `bindings`.
pub fn expand(template: &str, bindings: &Bindings) -> DocResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(malformed(template, "nested '{'")),
                        Some(c) => name.push(c),
                        None => return Err(malformed(template, "unclosed '{'")),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(malformed(template, "empty placeholder"));
                }
                let value = bindings
                    .get(name)
                    .ok_or_else(|| DocumentError::MissingBinding {
                        template: template.to_string(),
                        name: name.to_string(),
                    })?;
                out.push_str(value);
            }
            '}' => return Err(malformed(template, "unmatched '}'")),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Names of the placeholders used by `template`, in order of appearance.
pub fn placeholders(template: &str) -> DocResult<Vec<String>> {
    let mut names = Vec::new();
    let mut rest = template.replace("{{", "").replace("}}", "");
    while let Some(start) = rest.find('{') {
        let end = rest[start..]
            .find('}')
            .ok_or_else(|| malformed(template, "unclosed '{'"))?;
        names.push(rest[start + 1..start + end].trim().to_string());
        rest = rest[start + end + 1..].to_string();
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expands_placeholders() {
        let b = bindings(&[("person_id", "42"), ("year", "2024")]);
        assert_eq!(expand("employee-{person_id}", &b).unwrap(), "employee-42");
        assert_eq!(expand("{year}/{person_id}", &b).unwrap(), "2024/42");
        assert_eq!(expand("{ person_id }", &b).unwrap(), "42");
        assert_eq!(expand("plain", &b).unwrap(), "plain");
    }

    #[test]
    fn escaped_braces() {
        let b = bindings(&[("id", "7")]);
        assert_eq!(expand("{{x}}-{id}", &b).unwrap(), "{x}-7");
    }

    #[test]
    fn missing_binding() {
        let err = expand("employee-{person_id}", &Bindings::new()).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MissingBinding { ref name, .. } if name == "person_id"
        ));
    }

    #[test]
    fn malformed_templates() {
        let b = bindings(&[("a", "1")]);
        for template in ["{a", "a}", "{}", "{{a}", "{a{b}}"] {
            assert!(
                matches!(expand(template, &b), Err(DocumentError::MalformedTemplate { .. })),
                "{template:?} accepted"
            );
        }
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(
            placeholders("{year}/emp-{person_id}").unwrap(),
            ["year", "person_id"]
        );
        assert!(placeholders("{{literal}}").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn brace_free_text_is_kept(
            prefix in "[a-z0-9_-]{0,12}",
            suffix in "[a-z0-9_-]{0,12}",
            value in "[A-Za-z0-9]{1,8}",
        ) {
            let b = bindings(&[("key", value.as_str())]);
            let template = format!("{prefix}{{key}}{suffix}");
            prop_assert_eq!(
                expand(&template, &b).unwrap(),
                format!("{prefix}{value}{suffix}")
            );
        }
    }
}
