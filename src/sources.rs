use std::fmt;

pub const FREELANCER_DETAIL: &str = "freelancer_detail";
pub const BUSINESS_DETAIL: &str = "business_detail";
pub const FREELANCER_FIELDS: &str = "freelancer_fields";
pub const BUSINESS_REPRESENTATIVE: &str = "business_representative";

/// Path pattern with a single `{id}` placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointTemplate(&'static str);

impl EndpointTemplate {
    pub const fn new(pattern: &'static str) -> Self {
        Self(pattern)
    }

    pub fn pattern(&self) -> &'static str {
        self.0
    }

    pub fn expand(&self, id: &str) -> String {
        self.0.replace("{id}", id)
    }
}

impl fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// How a secondary record is folded into its primary record when rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Copy the secondary object's fields next to the primary's; the primary
    /// keeps its own value on conflicting keys.
    Flatten,
    /// Store the whole secondary value under one field.
    Nest(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecondarySource {
    pub name: &'static str,
    pub template: EndpointTemplate,
    pub strategy: MergeStrategy,
}

impl SecondarySource {
    pub const fn flatten(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            template: EndpointTemplate::new(pattern),
            strategy: MergeStrategy::Flatten,
        }
    }

    pub const fn nested(name: &'static str, pattern: &'static str, field: &'static str) -> Self {
        Self {
            name,
            template: EndpointTemplate::new(pattern),
            strategy: MergeStrategy::Nest(field),
        }
    }
}

pub const FREELANCER_DETAIL_SOURCE: SecondarySource =
    SecondarySource::flatten(FREELANCER_DETAIL, "/influ/get-influ-by-userId/{id}");
pub const BUSINESS_DETAIL_SOURCE: SecondarySource =
    SecondarySource::flatten(BUSINESS_DETAIL, "/business/get-business-by-user-id/{id}");
pub const FREELANCER_FIELDS_SOURCE: SecondarySource =
    SecondarySource::nested(FREELANCER_FIELDS, "/field/get-all-field-of-influ/{id}", "fields");
pub const BUSINESS_REPRESENTATIVE_SOURCE: SecondarySource = SecondarySource::nested(
    BUSINESS_REPRESENTATIVE,
    "/business/{id}/representative",
    "representative",
);

pub const FREELANCER_LABELS: &[&str] = &["freelancer", "influencer", "influ"];
pub const BUSINESS_LABELS: &[&str] = &["business", "doanh nghiệp", "doanh nghiep"];

/// Static dispatch from a discriminator label to the secondary source that
/// enriches records carrying it.
#[derive(Clone, Debug, Default)]
pub struct SourceTable {
    entries: Vec<(Vec<String>, SecondarySource)>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freelancer and business profile detail, the table every
    /// role-dispatched view uses.
    pub fn marketplace() -> Self {
        Self::new()
            .with_source(FREELANCER_LABELS, FREELANCER_DETAIL_SOURCE)
            .with_source(BUSINESS_LABELS, BUSINESS_DETAIL_SOURCE)
    }

    pub fn with_source(mut self, labels: &[&str], source: SecondarySource) -> Self {
        let labels = labels.iter().map(|label| normalize(label)).collect();
        self.entries.push((labels, source));
        self
    }

    pub fn resolve(&self, discriminator: &str) -> Option<&SecondarySource> {
        let key = normalize(discriminator);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(labels, _)| labels.iter().any(|label| *label == key))
            .map(|(_, source)| source)
    }

    pub fn resolve_secondary_source(&self, discriminator: &str) -> Option<EndpointTemplate> {
        self.resolve(discriminator).map(|source| source.template)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SecondarySource> {
        self.entries.iter().map(|(_, source)| source)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
