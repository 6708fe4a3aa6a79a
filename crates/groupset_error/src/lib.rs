use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

#[derive(Debug)]
struct DbErrorInner {
    /// Message for the error.
    msg: String,
    /// Source of the error.
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Additional key/value pairs to include in the error output.
    fields: Vec<ErrorField>,
}

#[derive(Debug)]
struct ErrorField {
    key: String,
    value: String,
}

impl DbError {
    pub fn new(msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                msg: msg.into(),
                source: Some(source),
                fields: Vec::new(),
            }),
        }
    }

    /// Attach a key/value pair to the error.
    ///
    /// Fields are printed after the message in the order they were added.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push(ErrorField {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Get the value of a field by key, if one was attached.
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        for field in &self.inner.fields {
            write!(f, "\n  {}: {}", field.key, field.value)?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// An extension trait for adding context to the Error variant of a result.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(msg, Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None, naming what was required.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(DbError::new(format!("Missing required value: {msg}"))),
        }
    }
}
