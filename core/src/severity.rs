use std::fmt;

/// How bad an error is for the owning renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Invalid or unsupported configuration.
    /// The application keeps running, but the model is discarded.
    Warning,

    /// Native API failure, interface mismatch or device limit violation.
    /// The current rebuild pass is aborted and its objects released.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Errors that can tell their severity.
pub trait Leveled {
    /// Severity of this error.
    fn severity(&self) -> Severity;

    /// Log the error at the level matching its severity.
    fn log(&self)
    where
        Self: fmt::Display,
    {
        match self.severity() {
            Severity::Warning => log::warn!("{}", self),
            Severity::Critical => log::error!("{}", self),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("missing")
        }
    }

    impl Leveled for Missing {
        fn severity(&self) -> Severity {
            Severity::Warning
        }
    }

    #[test]
    fn critical_is_worse() {
        assert!(Severity::Critical > Severity::Warning);
        assert_eq!(Missing.severity().to_string(), "warning");
        Missing.log();
    }
}
