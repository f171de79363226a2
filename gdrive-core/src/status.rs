/// Result indicator set after each operation and read by the caller to pick
/// the process exit code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    /// Nothing has completed since the last reset.
    #[default]
    Uninitialized,
    Error,
    Success,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Uninitialized => 0,
            Status::Error => 1,
            Status::Success => 2,
        }
    }

    pub fn is_error(self) -> bool {
        self == Status::Error
    }
}

impl From<Status> for std::process::ExitCode {
    fn from(status: Status) -> Self {
        // codes are 0..=2 so the cast cannot truncate
        std::process::ExitCode::from(status.code() as u8)
    }
}
