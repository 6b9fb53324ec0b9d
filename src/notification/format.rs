//! Pure formatting of alert messages in Telegram HTML markup.

use crate::models::SeverityTier;

/// Data rendered into a full velocity alert.
#[derive(Debug, Clone)]
pub struct AlertData {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Repository description, if any.
    pub description: Option<String>,
    /// Current star count.
    pub stars: u64,
    /// Growth rate in stars per day.
    pub stars_per_day: f64,
    /// Primary language, if any.
    pub language: Option<String>,
    /// Repository age in fractional days.
    pub repo_age_days: f64,
    /// Classified severity tier.
    pub tier: SeverityTier,
}

/// Data rendered into a first-sighting alert. No growth rate exists yet.
#[derive(Debug, Clone)]
pub struct NewRepoAlertData {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Repository description, if any.
    pub description: Option<String>,
    /// Current star count.
    pub stars: u64,
    /// Primary language, if any.
    pub language: Option<String>,
    /// Repository age in fractional days.
    pub repo_age_days: f64,
}

/// One repository's summary line within a digest message.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Current star count.
    pub stars: u64,
    /// Growth rate in stars per day; `None` for first-sighting entries.
    pub stars_per_day: Option<f64>,
    /// Visual marker for the entry's tier.
    pub marker: &'static str,
}

/// Marker shown on first-sighting alerts.
pub const NEW_REPO_MARKER: &str = "\u{2728}";

/// Visual marker for a severity tier, for quick scanning.
pub fn tier_marker(tier: SeverityTier) -> &'static str {
    match tier {
        SeverityTier::Notable => "\u{2b50}",
        SeverityTier::Hot => "\u{1f525}",
        SeverityTier::Viral => "\u{1f680}",
    }
}

/// Escapes Telegram HTML special characters in user-controlled text.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders an age in days as a human-scale string.
pub fn format_age(repo_age_days: f64) -> String {
    if repo_age_days < 1.0 {
        "< 1 day".to_string()
    } else if repo_age_days < 30.0 {
        format!("{} days", repo_age_days.floor() as u64)
    } else {
        format!("{} months", (repo_age_days / 30.0).floor() as u64)
    }
}

fn repo_url(owner: &str, name: &str) -> String {
    format!("https://github.com/{}/{}", owner, name)
}

fn description_line(description: &Option<String>) -> String {
    match description {
        Some(d) => escape_html(d),
        None => "<i>No description</i>".to_string(),
    }
}

fn language_label(language: &Option<String>) -> String {
    match language {
        Some(l) => escape_html(l),
        None => "N/A".to_string(),
    }
}

/// Renders a full velocity alert, including the growth rate.
pub fn format_alert(data: &AlertData) -> String {
    let marker = tier_marker(data.tier);
    let url = repo_url(&data.owner, &data.name);
    let safe_owner = escape_html(&data.owner);
    let safe_name = escape_html(&data.name);

    format!(
        "{marker} <b>[{label}]</b> <a href=\"{url}\">{safe_owner}/{safe_name}</a>\n\
         Stars: <b>{stars}</b> (+{rate:.1}/day)\n\
         {description}\n\
         Language: {language} | Age: {age}",
        label = data.tier.label(),
        stars = data.stars,
        rate = data.stars_per_day,
        description = description_line(&data.description),
        language = language_label(&data.language),
        age = format_age(data.repo_age_days),
    )
}

/// Renders a first-sighting alert. Omits the growth rate, since none exists.
pub fn format_new_repo_alert(data: &NewRepoAlertData) -> String {
    let url = repo_url(&data.owner, &data.name);
    let safe_owner = escape_html(&data.owner);
    let safe_name = escape_html(&data.name);

    format!(
        "{NEW_REPO_MARKER} <b>[NEW]</b> <a href=\"{url}\">{safe_owner}/{safe_name}</a>\n\
         Stars: <b>{stars}</b>\n\
         {description}\n\
         Language: {language} | Age: {age}",
        stars = data.stars,
        description = description_line(&data.description),
        language = language_label(&data.language),
        age = format_age(data.repo_age_days),
    )
}

/// Renders a digest covering several alerts under a header stating the
/// count. Entries appear in the order given.
pub fn format_digest(entries: &[DigestEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("\u{1f4c8} <b>{} trending repositories</b>\n", entries.len()));

    for entry in entries {
        let url = repo_url(&entry.owner, &entry.name);
        let safe_owner = escape_html(&entry.owner);
        let safe_name = escape_html(&entry.name);
        let rate = match entry.stars_per_day {
            Some(rate) => format!(" (+{rate:.1}/day)"),
            None => String::new(),
        };
        lines.push(format!(
            "{} <a href=\"{url}\">{safe_owner}/{safe_name}</a> \u{2014} {} \u{2b50}{rate}",
            entry.marker, entry.stars,
        ));
    }

    lines.join("\n")
}
