//! Skill node boundary model.
//!
//! # Responsibility
//! - Define the record fetched from and written back to the backing store.
//! - Validate identifier and label shape before a node enters the graph.
//!
//! # Invariants
//! - `id` is non-empty, contains no whitespace and is at most 128 chars.
//! - `name` is not blank after trim.
//! - `prerequisite_ids = None` means "no prerequisites".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque stable identifier of one skill (trick) within a scope.
pub type SkillId = String;

/// Identifier of the category partition the editor works on.
pub type ScopeId = String;

const MAX_SKILL_ID_CHARS: usize = 128;

static SKILL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s]+$").expect("valid skill id regex"));

/// One skill as exchanged with the persistence gateway.
///
/// Serialized with camelCase keys so hosts can pass backend documents through
/// without remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillNode {
    /// Stable id, unique within one scope.
    pub id: SkillId,
    /// User-facing label.
    pub name: String,
    /// Optional difficulty ordinal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    /// Ids of skills that must be learned first.
    #[serde(default)]
    pub prerequisite_ids: Option<Vec<SkillId>>,
}

impl SkillNode {
    /// Creates a skill with no prerequisites and no difficulty.
    pub fn new(id: impl Into<SkillId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            difficulty: None,
            prerequisite_ids: None,
        }
    }

    /// Builder-style helper to attach a prerequisite list.
    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SkillId>,
    {
        self.prerequisite_ids = Some(prerequisites.into_iter().map(Into::into).collect());
        self
    }

    /// Builder-style helper to attach a difficulty ordinal.
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Returns prerequisites as a slice, treating `None` as empty.
    pub fn prerequisites(&self) -> &[SkillId] {
        self.prerequisite_ids.as_deref().unwrap_or(&[])
    }

    /// Validates id and name shape.
    pub fn validate(&self) -> Result<(), SkillValidationError> {
        validate_skill_id(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(SkillValidationError::BlankName(self.id.clone()));
        }
        for prerequisite in self.prerequisites() {
            validate_skill_id(prerequisite)?;
        }
        Ok(())
    }
}

/// Checks one id against the skill id syntax.
pub fn validate_skill_id(id: &str) -> Result<(), SkillValidationError> {
    if id.is_empty() {
        return Err(SkillValidationError::EmptyId);
    }
    if id.chars().count() > MAX_SKILL_ID_CHARS {
        return Err(SkillValidationError::IdTooLong(id.to_string()));
    }
    if !SKILL_ID_RE.is_match(id) {
        return Err(SkillValidationError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Skill shape validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillValidationError {
    EmptyId,
    IdTooLong(SkillId),
    InvalidId(SkillId),
    BlankName(SkillId),
}

impl Display for SkillValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "skill id must not be empty"),
            Self::IdTooLong(id) => write!(
                f,
                "skill id exceeds {MAX_SKILL_ID_CHARS} characters: {id}"
            ),
            Self::InvalidId(id) => write!(f, "skill id must not contain whitespace: `{id}`"),
            Self::BlankName(id) => write!(f, "skill name must not be blank: {id}"),
        }
    }
}

impl Error for SkillValidationError {}

#[cfg(test)]
mod tests {
    use super::{validate_skill_id, SkillNode, SkillValidationError};

    #[test]
    fn null_prerequisites_read_as_empty() {
        let node = SkillNode::new("kickflip", "Kickflip");
        assert!(node.prerequisites().is_empty());
    }

    #[test]
    fn validate_rejects_whitespace_ids_and_blank_names() {
        assert_eq!(
            validate_skill_id("has space"),
            Err(SkillValidationError::InvalidId("has space".to_string()))
        );
        assert_eq!(validate_skill_id(""), Err(SkillValidationError::EmptyId));

        let blank = SkillNode::new("ollie", "   ");
        assert!(matches!(
            blank.validate(),
            Err(SkillValidationError::BlankName(id)) if id == "ollie"
        ));
    }

    #[test]
    fn validate_rejects_overlong_ids() {
        let id = "x".repeat(129);
        assert!(matches!(
            validate_skill_id(&id),
            Err(SkillValidationError::IdTooLong(_))
        ));
        assert!(validate_skill_id(&"x".repeat(128)).is_ok());
    }
}
