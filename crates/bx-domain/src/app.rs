use serde::{Deserialize, Serialize};

/// The slice of an application's configuration the execution layer needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub app_name: String,
    pub bundle: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_requires: Option<Vec<String>>,
}

impl AppDescriptor {
    pub fn new(app_name: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            bundle: bundle.into(),
            sources: Vec::new(),
            system_requires: None,
        }
    }

    #[must_use]
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_system_requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.system_requires = Some(requires.into_iter().map(Into::into).collect());
        self
    }

    /// Reverse-DNS identifier, e.g. `com.example.myapp`.
    #[must_use]
    pub fn app_id(&self) -> String {
        format!("{}.{}", self.bundle, self.app_name)
    }

    /// System requirements as a single space-joined build argument.
    ///
    /// Apps that declare no requirements yield an empty string.
    #[must_use]
    pub fn system_requires_arg(&self) -> String {
        self.system_requires
            .as_ref()
            .map(|reqs| reqs.join(" "))
            .unwrap_or_default()
    }
}
