//! Filter and pagination inputs collected by the request handler.

#![allow(missing_docs)]

use std::fmt;

use serde::{Serialize, Serializer};

use crate::query::sources::{SOURCE_TABLES, ServiceGroup, SourceTableSpec};

/// Service selector from the filter form.
///
/// Matching is case-sensitive on the form values `Apache`, `FTP` and
/// `Todos`. Any other value selects no source at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Service {
    /// No service chosen; every source participates.
    #[default]
    Any,
    /// Explicit "all services" choice (`Todos`).
    All,
    /// Apache access and error tables.
    Apache,
    /// FTP transfer table.
    Ftp,
    /// Unrecognized service name; matches nothing.
    Unknown(String),
}

impl Service {
    /// Parse the raw form value. Empty or missing text means [`Service::Any`].
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Any,
            Some("Todos") => Self::All,
            Some("Apache") => Self::Apache,
            Some("FTP") => Self::Ftp,
            Some(other) => Self::Unknown(other.to_string()),
        }
    }

    /// Whether a source table participates under this selector.
    #[must_use]
    pub fn includes(&self, group: ServiceGroup) -> bool {
        match self {
            Self::Any | Self::All => true,
            Self::Apache => group == ServiceGroup::Apache,
            Self::Ftp => group == ServiceGroup::Ftp,
            Self::Unknown(_) => false,
        }
    }

    /// Source tables enabled by this selector, in union order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &'static SourceTableSpec> + '_ {
        SOURCE_TABLES
            .iter()
            .filter(move |spec| self.includes(spec.group))
    }

    /// Form value that round-trips through [`Service::parse`]; `None` for [`Service::Any`].
    #[must_use]
    pub fn as_form_value(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::All => Some("Todos"),
            Self::Apache => Some("Apache"),
            Self::Ftp => Some("FTP"),
            Self::Unknown(raw) => Some(raw),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_form_value().unwrap_or("(any)"))
    }
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_form_value() {
            Some(value) => serializer.serialize_some(value),
            None => serializer.serialize_none(),
        }
    }
}

/// The operator's query intent. Every field is independently optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterSet {
    service: Service,
    address: Option<String>,
    date_start: Option<String>,
    date_end: Option<String>,
    keyword: Option<String>,
}

impl FilterSet {
    /// Start building a filter set.
    #[must_use]
    pub fn builder() -> FilterSetBuilder {
        FilterSetBuilder::default()
    }

    /// Build from raw optional form values, treating blank text as absent.
    #[must_use]
    pub fn from_raw(
        service: Option<&str>,
        address: Option<&str>,
        date_start: Option<&str>,
        date_end: Option<&str>,
        keyword: Option<&str>,
    ) -> Self {
        Self {
            service: Service::parse(service),
            address: present(address),
            date_start: present(date_start),
            date_end: present(date_end),
            keyword: present(keyword),
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn date_start(&self) -> Option<&str> {
        self.date_start.as_deref()
    }

    pub fn date_end(&self) -> Option<&str> {
        self.date_end.as_deref()
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// True when no field constrains the result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service == Service::Any
            && self.address.is_none()
            && self.date_start.is_none()
            && self.date_end.is_none()
            && self.keyword.is_none()
    }
}

/// Builder for [`FilterSet`]; blank values are dropped.
#[derive(Debug, Clone, Default)]
pub struct FilterSetBuilder {
    inner: FilterSet,
}

impl FilterSetBuilder {
    #[must_use]
    pub fn service(mut self, raw: &str) -> Self {
        self.inner.service = Service::parse(Some(raw));
        self
    }

    #[must_use]
    pub fn address(mut self, raw: &str) -> Self {
        self.inner.address = present(Some(raw));
        self
    }

    #[must_use]
    pub fn date_start(mut self, raw: &str) -> Self {
        self.inner.date_start = present(Some(raw));
        self
    }

    #[must_use]
    pub fn date_end(mut self, raw: &str) -> Self {
        self.inner.date_end = present(Some(raw));
        self
    }

    #[must_use]
    pub fn keyword(mut self, raw: &str) -> Self {
        self.inner.keyword = present(Some(raw));
        self
    }

    #[must_use]
    pub fn build(self) -> FilterSet {
        self.inner
    }
}

fn present(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a page request; zero values are raised to 1.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}
