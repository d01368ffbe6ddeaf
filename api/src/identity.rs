/// Service identities
///
/// The registry runs one binary per record family. Identity drives the
/// secret port key, the advertised service name, and the static default
/// port each family falls back to.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceIdentity {
    Student,
    Teacher,
    Employee,
}

impl ServiceIdentity {
    /// Key under which this service's port lives in the shared ports path.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Employee => "employee",
        }
    }

    pub fn service_name(&self) -> &'static str {
        match self {
            Self::Student => "student-service",
            Self::Teacher => "teacher-service",
            Self::Employee => "employee-service",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Student => 5001,
            Self::Teacher => 5002,
            Self::Employee => 5003,
        }
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}
