//! Candidate profile records
//!
//! The conversation core only reads `basic_info.name`. The rest backs the
//! profile editing commands of the terminal client.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// Record Types
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerObjective {
    pub target_position: String,
    pub target_industry: String,
    pub target_role_types: Vec<String>,
    pub preferred_location: String,
    pub career_goals: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub name: String,
    pub level: u8,
    pub years: f32,
}

/// Skills grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCategories {
    pub programming_languages: Vec<Skill>,
    pub ai_ml_frameworks: Vec<Skill>,
    pub backend_frameworks: Vec<Skill>,
    pub databases: Vec<Skill>,
    pub cloud_devops: Vec<Skill>,
    pub ai_specialties: Vec<Skill>,
    pub finance_knowledge: Vec<Skill>,
}

impl SkillCategories {
    /// Every skill across all categories
    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.programming_languages
            .iter()
            .chain(&self.ai_ml_frameworks)
            .chain(&self.backend_frameworks)
            .chain(&self.databases)
            .chain(&self.cloud_devops)
            .chain(&self.ai_specialties)
            .chain(&self.finance_knowledge)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub duration: String,
    pub responsibilities: Vec<String>,
    pub technologies: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub role: String,
    pub team_size: u32,
    pub duration: String,
    pub technologies: Vec<String>,
    pub challenges: String,
    pub solutions: String,
    pub results: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub school: String,
    pub graduation_year: i32,
    pub relevant_courses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    pub language: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub work_style: String,
    pub values: String,
    pub interests: Vec<String>,
}

/// Complete candidate profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub basic_info: BasicInfo,
    pub career_objective: CareerObjective,
    pub work_experience: Vec<WorkExperience>,
    pub projects: Vec<Project>,
    pub skills: SkillCategories,
    pub education: Vec<Education>,
    pub certifications: Vec<String>,
    pub personality: Personality,
    pub languages: Vec<Language>,
}

/// A stored user as returned by the profile service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub profile_data: Profile,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Entry of the user listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Profile {
    /// Trimmed display name, if one is set
    pub fn display_name(&self) -> Option<&str> {
        let name = self.basic_info.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Apply a single field edit
    pub fn apply(&mut self, edit: ProfileEdit) {
        match edit {
            ProfileEdit::Name(v) => self.basic_info.name = v,
            ProfileEdit::Email(v) => self.basic_info.email = v,
            ProfileEdit::Phone(v) => self.basic_info.phone = v,
            ProfileEdit::Location(v) => self.basic_info.location = v,
            ProfileEdit::Linkedin(v) => self.basic_info.linkedin = v,
            ProfileEdit::Github(v) => self.basic_info.github = v,
            ProfileEdit::TargetPosition(v) => self.career_objective.target_position = v,
            ProfileEdit::TargetIndustry(v) => self.career_objective.target_industry = v,
            ProfileEdit::TargetRoleTypes(v) => self.career_objective.target_role_types = v,
            ProfileEdit::PreferredLocation(v) => self.career_objective.preferred_location = v,
            ProfileEdit::CareerGoals(v) => self.career_objective.career_goals = v,
            ProfileEdit::WorkStyle(v) => self.personality.work_style = v,
            ProfileEdit::Values(v) => self.personality.values = v,
            ProfileEdit::Interests(v) => self.personality.interests = v,
            ProfileEdit::Certifications(v) => self.certifications = v,
        }
    }

    /// Check the constraints the profile service enforces on save
    pub fn validate(&self) -> Result<(), ValidationError> {
        let info = &self.basic_info;

        // Raw length, padding included, as the service counts it
        let name_len = info.name.chars().count();
        if !(1..=100).contains(&name_len) {
            return Err(ValidationError::Name);
        }
        if !email_pattern().is_match(&info.email) {
            return Err(ValidationError::Email(info.email.clone()));
        }
        let phone_len = info.phone.chars().count();
        if !(10..=20).contains(&phone_len) {
            return Err(ValidationError::Phone(info.phone.clone()));
        }
        if let Some(url) = info.linkedin.as_deref() {
            if !linkedin_pattern().is_match(url) {
                return Err(ValidationError::Linkedin(url.to_string()));
            }
        }
        if let Some(url) = info.github.as_deref() {
            if !url.starts_with("https://github.com/") || url.len() <= "https://github.com/".len() {
                return Err(ValidationError::Github(url.to_string()));
            }
        }

        for skill in self.skills.iter() {
            if skill.name.is_empty() {
                return Err(ValidationError::SkillName);
            }
            if !(1..=5).contains(&skill.level) {
                return Err(ValidationError::SkillLevel {
                    skill: skill.name.clone(),
                    level: skill.level,
                });
            }
            if skill.years < 0.0 {
                return Err(ValidationError::SkillYears(skill.name.clone()));
            }
        }

        if let Some(project) = self.projects.iter().find(|p| p.team_size == 0) {
            return Err(ValidationError::TeamSize(project.name.clone()));
        }

        if let Some(edu) = self
            .education
            .iter()
            .find(|e| !(1950..=2030).contains(&e.graduation_year))
        {
            return Err(ValidationError::GraduationYear(edu.graduation_year));
        }

        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email pattern"))
}

fn linkedin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://(www\.)?linkedin\.com/.+").expect("valid linkedin pattern")
    })
}

/// Why a profile would be rejected on save
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name must be between 1 and 100 characters")]
    Name,
    #[error("invalid email address: {0}")]
    Email(String),
    #[error("phone number must be 10 to 20 characters: {0}")]
    Phone(String),
    #[error("LinkedIn URL must start with https://linkedin.com/: {0}")]
    Linkedin(String),
    #[error("GitHub URL must start with https://github.com/: {0}")]
    Github(String),
    #[error("skill name must not be empty")]
    SkillName,
    #[error("skill {skill} has level {level}, expected 1-5")]
    SkillLevel { skill: String, level: u8 },
    #[error("skill {0} has negative years of experience")]
    SkillYears(String),
    #[error("project {0} must have a team size of at least 1")]
    TeamSize(String),
    #[error("graduation year {0} is outside 1950-2030")]
    GraduationYear(i32),
}

// ============================================================================
// Typed Edits
// ============================================================================

/// One field-level change to a profile
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEdit {
    Name(String),
    Email(String),
    Phone(String),
    Location(String),
    Linkedin(Option<String>),
    Github(Option<String>),
    TargetPosition(String),
    TargetIndustry(String),
    TargetRoleTypes(Vec<String>),
    PreferredLocation(String),
    CareerGoals(String),
    WorkStyle(String),
    Values(String),
    Interests(Vec<String>),
    Certifications(Vec<String>),
}

/// Field keys accepted by [`ProfileEdit::parse`]
pub const EDITABLE_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "location",
    "linkedin",
    "github",
    "target_position",
    "target_industry",
    "target_role_types",
    "preferred_location",
    "career_goals",
    "work_style",
    "values",
    "interests",
    "certifications",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown profile field: {0}")]
pub struct UnknownField(pub String);

impl ProfileEdit {
    /// Build an edit from a flat field key and a raw value.
    ///
    /// List fields take comma-separated values; an empty value clears the
    /// optional URL fields.
    pub fn parse(field: &str, value: &str) -> Result<Self, UnknownField> {
        let text = value.trim().to_string();
        let optional = (!text.is_empty()).then(|| text.clone());
        let list = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        };

        let edit = match field {
            "name" => ProfileEdit::Name(text),
            "email" => ProfileEdit::Email(text),
            "phone" => ProfileEdit::Phone(text),
            "location" => ProfileEdit::Location(text),
            "linkedin" => ProfileEdit::Linkedin(optional),
            "github" => ProfileEdit::Github(optional),
            "target_position" => ProfileEdit::TargetPosition(text),
            "target_industry" => ProfileEdit::TargetIndustry(text),
            "target_role_types" => ProfileEdit::TargetRoleTypes(list()),
            "preferred_location" => ProfileEdit::PreferredLocation(text),
            "career_goals" => ProfileEdit::CareerGoals(text),
            "work_style" => ProfileEdit::WorkStyle(text),
            "values" => ProfileEdit::Values(text),
            "interests" => ProfileEdit::Interests(list()),
            "certifications" => ProfileEdit::Certifications(list()),
            other => return Err(UnknownField(other.to_string())),
        };
        Ok(edit)
    }
}
