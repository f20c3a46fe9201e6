//! On-screen title templating.
//!
//! Templates use `{video_id}` and `{category}` placeholders; `{{` and `}}`
//! produce literal braces. A malformed template never fails a render: the
//! fixed fallback layout is used instead.

/// Default title layout, split over three lines.
pub const DEFAULT_TITLE_TEMPLATE: &str = "EXP_{video_id} //\n {category} // \n FIND THE ANOMALY";

/// Layout used when a configured template cannot be applied.
pub fn fallback_title(video_id: &str, category: &str) -> String {
    format!("EXP_{video_id} // {category} // FIND THE ANOMALY")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder `{{{0}}}`")]
    UnknownKey(String),
    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
}

/// Substitute `{key}` placeholders from `vars`.
pub fn apply_template(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    if c == '{' {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    key.push(c);
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBrace(pos));
                }
                let value = vars
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or(TemplateError::UnknownKey(key))?;
                out.push_str(value);
            }
            '}' => return Err(TemplateError::UnbalancedBrace(pos)),
            _ => out.push(ch),
        }
    }

    Ok(out)
}

/// Build the on-screen title, falling back to [`fallback_title`] when the
/// template is malformed.
pub fn render_title(template: &str, video_id: &str, category: &str) -> String {
    match apply_template(template, &[("video_id", video_id), ("category", category)]) {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!("title template {:?} is malformed ({}); using fallback", template, e);
            fallback_title(video_id, category)
        }
    }
}
