use serde::{Deserialize, Serialize};

/// One of the three account roles the backend models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Professor,
    Hod,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Professor, Role::Hod];

    /// Lowercase tag used in storage keys and route paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Hod => "hod",
        }
    }

    /// Human-facing role name, used verbatim in error messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Hod => "HOD",
        }
    }

    /// Plural path segment the backend uses for this role's resources.
    pub fn collection_segment(self) -> &'static str {
        match self {
            Role::Student => "students",
            Role::Professor => "professors",
            Role::Hod => "hods",
        }
    }

    /// Role-scoped identifier key in login responses and profile payloads.
    pub fn id_key(self) -> &'static str {
        match self {
            Role::Student => "studentId",
            Role::Professor => "professorId",
            Role::Hod => "hodId",
        }
    }

    /// Session store key holding the serialized profile blob.
    pub fn data_key(self) -> String {
        format!("{}Data", self.as_str())
    }

    /// Session store key holding the bare identifier.
    pub fn id_store_key(self) -> String {
        format!("{}Id", self.as_str())
    }

    /// Session store key for the remember-me preference.
    pub fn remember_key(self) -> &'static str {
        match self {
            Role::Student => "rememberStudent",
            Role::Professor => "rememberProfessor",
            Role::Hod => "rememberHOD",
        }
    }

    pub fn dashboard_path(self) -> String {
        format!("/dashboard/{}/home", self.as_str())
    }

    pub fn sign_in_path(self) -> String {
        format!("/auth/{}/sign-in", self.as_str())
    }

    pub fn from_tag(tag: &str) -> Option<Role> {
        match tag {
            "student" => Some(Role::Student),
            "professor" => Some(Role::Professor),
            "hod" => Some(Role::Hod),
            _ => None,
        }
    }
}

/// Logical operation a form drives against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SignIn,
    Register,
}

/// Normalized, role-tagged representation of the authenticated user.
///
/// The backend returns profiles with role-specific field names; this is the
/// one canonical shape the rest of the client consumes. `raw_profile` keeps
/// the untouched payload for callers that need fields we do not normalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub role: Role,
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub image_url: Option<String>,
    pub raw_profile: serde_json::Value,
}

/// Landing page shown to logged-out users; logout navigates here.
pub const LANDING_PATH: &str = "/";
