use chrono::{Local, NaiveDateTime};
use serde::Deserialize;

/// Application settings, read from `Rocket.toml` and `ROCKET_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    /// Overrides the origin used when building shareable RSVP links.
    pub base_url: Option<String>,
    /// Local time after which guests can no longer change a response.
    pub rsvp_cutoff: Option<NaiveDateTime>,
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    pub notify: Option<NotifyConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    Memory,
    Mysql,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    pub relay: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

fn default_token_length() -> usize {
    8
}

impl Settings {
    pub fn cutoff_reached(&self) -> bool {
        self.cutoff_reached_at(Local::now().naive_local())
    }

    pub fn cutoff_reached_at(&self, now: NaiveDateTime) -> bool {
        self.rsvp_cutoff.is_some_and(|cutoff| now >= cutoff)
    }

    pub fn cutoff_label(&self) -> Option<String> {
        self.rsvp_cutoff
            .map(|cutoff| cutoff.format("%Y/%m/%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::Figment;

    fn settings(cutoff: Option<&str>) -> Settings {
        let mut figment = Figment::new();
        if let Some(cutoff) = cutoff {
            figment = figment.merge(("rsvp_cutoff", cutoff));
        }
        figment.extract().expect("settings")
    }

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let settings = settings(None);
        assert_eq!(settings.storage, Storage::Memory);
        assert_eq!(settings.token_length, 8);
        assert!(settings.base_url.is_none());
        assert!(settings.notify.is_none());
        assert!(!settings.cutoff_reached());
    }

    #[test]
    fn cutoff_is_reached_at_the_exact_instant() {
        let settings = settings(Some("2025-11-08T23:59:59"));
        let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap();

        assert!(!settings.cutoff_reached_at(at("2025-11-08T23:59:58")));
        assert!(settings.cutoff_reached_at(at("2025-11-08T23:59:59")));
        assert!(settings.cutoff_reached_at(at("2025-11-09T08:00:00")));
        assert_eq!(settings.cutoff_label().as_deref(), Some("2025/11/08"));
    }
}
