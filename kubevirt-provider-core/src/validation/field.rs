use std::fmt::{self, Display};

/// Path to a field of a validated object, e.g. `networks.tenantNetworks[1].default`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(String);

impl Path {
    pub fn new(root: &str) -> Self {
        Self(root.to_owned())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_owned())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{key}]", self.0))
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Required,
    Invalid,
    Duplicate,
    Forbidden,
    NotSupported,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorType::Required => "Required value",
            ErrorType::Invalid => "Invalid value",
            ErrorType::Duplicate => "Duplicate value",
            ErrorType::Forbidden => "Forbidden",
            ErrorType::NotSupported => "Unsupported value",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub error_type: ErrorType,
    pub field: String,
    pub bad_value: Option<String>,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Required, path, None, detail.into())
    }

    pub fn invalid(path: &Path, value: impl ToString, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Invalid, path, Some(value.to_string()), detail.into())
    }

    pub fn duplicate(path: &Path, value: impl ToString) -> Self {
        Self::new(ErrorType::Duplicate, path, Some(value.to_string()), String::new())
    }

    pub fn forbidden(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Forbidden, path, None, detail.into())
    }

    pub fn not_supported(path: &Path, value: impl ToString, supported: &[&str]) -> Self {
        Self::new(
            ErrorType::NotSupported,
            path,
            Some(value.to_string()),
            format!("supported values: {}", supported.join(", ")),
        )
    }

    fn new(error_type: ErrorType, path: &Path, bad_value: Option<String>, detail: String) -> Self {
        Self {
            error_type,
            field: path.to_string(),
            bad_value,
            detail,
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_type)?;

        if let Some(value) = &self.bad_value {
            write!(f, ": {value:?}")?;
        }

        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }

        Ok(())
    }
}

pub type ErrorList = Vec<FieldError>;

/// Joins all errors into a single admission denial message.
pub fn aggregate(errors: &ErrorList) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
