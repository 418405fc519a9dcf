use archscope_api::DocFilter;

/// Documentation filter for JSDoc-style comments.
///
/// Strips comment delimiters and leading `*`, keeps the free-text
/// description up to the first block tag (`@param`, `@return`, ...), and
/// rejects comments tagged `@ignore`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsDocFilter;

impl DocFilter for JsDocFilter {
    fn filter(&self, raw: &str) -> Option<String> {
        let body = raw.trim();
        let body = body
            .strip_prefix("/**")
            .or_else(|| body.strip_prefix("/*"))
            .unwrap_or(body);
        let body = body.strip_suffix("*/").unwrap_or(body);

        let mut description = Vec::new();
        let mut in_tags = false;
        for line in body.lines() {
            let line = line.trim();
            let line = line.strip_prefix("//").unwrap_or(line);
            let line = line.strip_prefix('*').unwrap_or(line).trim();
            if line.starts_with("@ignore") {
                return None;
            }
            if line.starts_with('@') {
                in_tags = true;
            }
            if in_tags {
                continue;
            }
            description.push(line);
        }

        let text = description.join("\n").trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_description_only() {
        let raw = "/**\n * Add a definition.\n * Second line.\n * @param {String} name\n */";
        assert_eq!(
            JsDocFilter.filter(raw).as_deref(),
            Some("Add a definition.\nSecond line.")
        );
    }

    #[test]
    fn test_ignore_tag_drops_comment() {
        let raw = "/**\n * Gets plugins.\n * @ignore not public\n */";
        assert_eq!(JsDocFilter.filter(raw), None);
    }

    #[test]
    fn test_line_comments() {
        assert_eq!(
            JsDocFilter.filter("// Tern-based code completion.").as_deref(),
            Some("Tern-based code completion.")
        );
    }

    #[test]
    fn test_empty_comment() {
        assert_eq!(JsDocFilter.filter("/* */"), None);
    }
}
