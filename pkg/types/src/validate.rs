use anyhow::{Result, bail};

/// Validate a Kubernetes-style resource name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Validate a label key: optional `prefix/` followed by a name segment of
/// at most 63 chars of `[A-Za-z0-9._-]`, starting and ending alphanumeric.
pub fn validate_label_key(key: &str) -> Result<()> {
    let segment = match key.split_once('/') {
        Some((prefix, segment)) => {
            if prefix.is_empty() || prefix.len() > 253 {
                bail!("label key '{}' has an invalid prefix", key);
            }
            segment
        }
        None => key,
    };
    if segment.is_empty() {
        bail!("label key '{}' must have a name segment", key);
    }
    validate_label_segment(key, segment)
}

/// Validate a label value: empty, or the same charset rules as a key segment.
pub fn validate_label_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    validate_label_segment(value, value)
}

fn validate_label_segment(full: &str, segment: &str) -> Result<()> {
    if segment.len() > 63 {
        bail!("label '{}' exceeds 63 characters", full);
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(segment.chars().next()) || !alnum(segment.chars().last()) {
        bail!("label '{}' must start and end with an alphanumeric character", full);
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        bail!("label '{}' contains invalid characters", full);
    }
    Ok(())
}
