/// Outcome of a mount attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountStatus {
    Success,
    /// Mount did not become ready; carries a human-readable reason
    Failure(String),
}

impl MountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountStatus::Success => "success",
            MountStatus::Failure(_) => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MountStatus::Success)
    }
}

impl std::fmt::Display for MountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountStatus::Success => write!(f, "{}", self.as_str()),
            MountStatus::Failure(reason) => write!(f, "{}: {}", self.as_str(), reason),
        }
    }
}
