//! Recovery of candidate profiles from the candidates agent's reply.
//!
//! The agent is asked for a JSON object but regularly returns a fenced block
//! whose `resume_content` holds unescaped newlines and quotes. Strict parsing
//! is tried first; when it fails or finds nothing, fields are scraped one by one.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::agent_client::strip_json_fence;
use crate::candidates::repository::NewCandidate;
use crate::documents::{file_extension, file_stem};

const NOT_SPECIFIED: &str = "Not specified";

const SCRAPED_FIELDS: [&str; 7] = [
    "name",
    "email",
    "phone",
    "current_role",
    "current_company",
    "location",
    "experience",
];

/// `"field": "value"` for each scraped field; the value cannot contain a quote.
static FIELD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SCRAPED_FIELDS
        .iter()
        .map(|field| {
            let pattern = format!(r#""{}"\s*:\s*"([^"]*?)""#, regex::escape(field));
            (*field, Regex::new(&pattern).expect("field pattern is valid"))
        })
        .collect()
});

/// `resume_content` runs to the first quote that is followed by `}`.
static RESUME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""resume_content"\s*:\s*"([\s\S]*?)"\s*\}[\s\S]*$"#)
        .expect("resume pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub resume_content: String,
}

impl CandidateProfile {
    fn is_empty(&self) -> bool {
        self.resume_content.is_empty()
            && self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.current_role.is_none()
            && self.current_company.is_none()
            && self.location.is_none()
            && self.experience.is_none()
    }

    fn set(&mut self, field: &str, value: Option<String>) {
        let slot = match field {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "current_role" => &mut self.current_role,
            "current_company" => &mut self.current_company,
            "location" => &mut self.location,
            "experience" => &mut self.experience,
            _ => return,
        };
        *slot = value.filter(|v| !v.trim().is_empty());
    }
}

/// Recovers a profile from the agent text. `None` when nothing usable is found.
pub fn recover_profile(response_text: &str) -> Option<CandidateProfile> {
    let raw = strip_json_fence(response_text);
    let profile = parse_strict(raw)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| scrape(raw));
    if profile.is_empty() {
        None
    } else {
        Some(profile)
    }
}

fn parse_strict(raw: &str) -> Option<CandidateProfile> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(unescape_entities)
    };

    let mut profile = CandidateProfile {
        resume_content: text("resume_content").unwrap_or_default(),
        ..Default::default()
    };
    for field in SCRAPED_FIELDS {
        profile.set(field, text(field));
    }
    Some(profile)
}

fn scrape(raw: &str) -> CandidateProfile {
    let mut profile = CandidateProfile {
        resume_content: capture(&RESUME_PATTERN, raw).unwrap_or_default(),
        ..Default::default()
    };
    for (field, pattern) in FIELD_PATTERNS.iter() {
        profile.set(field, capture(pattern, raw));
    }
    profile
}

fn capture(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| unescape_entities(m.as_str()))
}

pub fn unescape_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Where a recovered profile is stored and under which upload it arrived.
pub struct ResumeUpload<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: &'a str,
    pub group_name: &'a str,
    pub storage_key: Option<String>,
}

impl CandidateProfile {
    /// Applies the storage defaults: name falls back to the file stem, the
    /// descriptive fields to "Not specified".
    pub fn into_new_candidate(self, upload: ResumeUpload<'_>) -> NewCandidate {
        let file_type = match file_extension(upload.file_name) {
            ext if ext.is_empty() => "unknown".to_string(),
            ext => ext,
        };
        let or_default = |v: Option<String>| v.unwrap_or_else(|| NOT_SPECIFIED.to_string());

        NewCandidate {
            id: upload.id,
            user_id: upload.user_id,
            name: self
                .name
                .unwrap_or_else(|| file_stem(upload.file_name).to_string()),
            email: self.email,
            phone: self.phone,
            current_role: or_default(self.current_role),
            current_company: or_default(self.current_company),
            location: or_default(self.location),
            experience: or_default(self.experience),
            group_name: upload.group_name.to_string(),
            file_name: upload.file_name.to_string(),
            file_type,
            resume_content: self.resume_content,
            storage_key: upload.storage_key,
        }
    }
}
