//! Domain models shared across the examreg crates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A faculty. Owned independently; referenced by semesters and students.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    #[serde(rename = "id")]
    pub guid: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A semester within a faculty. The faculty reference is advisory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    #[serde(rename = "id")]
    pub guid: Uuid,
    pub name: String,
    #[serde(rename = "faculty")]
    pub faculty_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One graded subject row embedded in a student record.
///
/// `lecture` is free text (lecturer or section label); the remaining
/// fields are optional marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub lecture: Option<String>,
    #[serde(default)]
    pub activity1: Option<f64>,
    #[serde(default)]
    pub mid_exam: Option<f64>,
    #[serde(default)]
    pub activity2: Option<f64>,
    #[serde(default, rename = "final")]
    pub final_exam: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

/// A student registration within one faculty and semester.
///
/// `normalized_name` is derived from `name` (see [`crate::normalize_name`])
/// and both (student_id, faculty, semester) and
/// (normalized_name, faculty, semester) are unique in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "id")]
    pub guid: Uuid,
    pub student_id: String,
    pub name: String,
    pub normalized_name: String,
    pub phone: Option<String>,
    #[serde(rename = "faculty")]
    pub faculty_id: Uuid,
    #[serde(rename = "semester")]
    pub semester_id: Uuid,
    pub subjects: Vec<Subject>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a sitting action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SittingTarget {
    Faculty,
    Semester,
    Student,
}

impl SittingTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            SittingTarget::Faculty => "faculty",
            SittingTarget::Semester => "semester",
            SittingTarget::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "faculty" => Some(SittingTarget::Faculty),
            "semester" => Some(SittingTarget::Semester),
            "student" => Some(SittingTarget::Student),
            _ => None,
        }
    }

    /// Human label used in resolve error messages.
    pub fn label(self) -> &'static str {
        match self {
            SittingTarget::Faculty => "Faculty",
            SittingTarget::Semester => "Semester",
            SittingTarget::Student => "Student",
        }
    }
}

/// The deferred mutation a sitting action proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SittingKind {
    Delete,
    Update,
}

impl SittingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SittingKind::Delete => "delete",
            SittingKind::Update => "update",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "delete" => Some(SittingKind::Delete),
            "update" => Some(SittingKind::Update),
            _ => None,
        }
    }
}

/// Sitting action lifecycle.
///
/// `Applying` is a transient claim state: an approval first moves the
/// action from `Pending` to `Applying`, performs the mutation, then
/// persists `Approved`. A crash mid-apply leaves `Applying`, which can
/// never be claimed again, so the mutation cannot be applied twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SittingStatus {
    Pending,
    Applying,
    Approved,
    Cancelled,
}

impl SittingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SittingStatus::Pending => "pending",
            SittingStatus::Applying => "applying",
            SittingStatus::Approved => "approved",
            SittingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SittingStatus::Pending),
            "applying" => Some(SittingStatus::Applying),
            "approved" => Some(SittingStatus::Approved),
            "cancelled" => Some(SittingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A queued, human-approvable proposal to mutate or remove an entity.
///
/// `display_name` snapshots the target's name at proposal time so the
/// backlog stays readable after the target changes or disappears.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SittingAction {
    #[serde(rename = "id")]
    pub guid: Uuid,
    #[serde(rename = "targetType")]
    pub target: SittingTarget,
    #[serde(rename = "targetRef")]
    pub target_id: Uuid,
    pub display_name: String,
    #[serde(rename = "mutationKind")]
    pub kind: SittingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub status: SittingStatus,
    pub created_at: DateTime<Utc>,
}

/// Update payload for faculty and semester actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameUpdate {
    pub name: String,
}

/// Update payload for student actions. Absent fields are left untouched
/// when the action is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
}
