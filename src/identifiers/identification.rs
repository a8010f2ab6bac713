/*! Language identification result.

Identifications serialize as `{"label": "de", "prob": 0.93}`.
!*/
use lazy_static::lazy_static;
use oxilangtag::{LanguageTag, LanguageTagParseError};
use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref UNDETERMINED: LanguageTag<String> =
        LanguageTag::parse("und".to_string()).expect("und is a valid BCP-47 tag");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IdentificationSer", into = "IdentificationSer")]
pub struct Identification {
    label: LanguageTag<String>,
    prob: f32,
}

/// Serializable version of [Identification].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IdentificationSer {
    label: String,
    prob: f32,
}

impl From<Identification> for IdentificationSer {
    fn from(i: Identification) -> Self {
        Self {
            label: i.label.into_inner(),
            prob: i.prob,
        }
    }
}

impl TryFrom<IdentificationSer> for Identification {
    type Error = LanguageTagParseError;
    fn try_from(i: IdentificationSer) -> Result<Self, Self::Error> {
        Ok(Self {
            label: LanguageTag::parse_and_normalize(&i.label)?,
            prob: i.prob,
        })
    }
}

impl JsonSchema for Identification {
    fn schema_name() -> String {
        "Identification".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        IdentificationSer::json_schema(gen)
    }
}

impl Identification {
    pub fn new(label: LanguageTag<String>, prob: f32) -> Self {
        Self { label, prob }
    }

    /// Undetermined language (`und`) with a null confidence.
    pub fn undetermined() -> Self {
        Self {
            label: UNDETERMINED.clone(),
            prob: 0.0,
        }
    }

    /// Get a reference to the identification's label.
    pub fn label(&self) -> &LanguageTag<String> {
        &self.label
    }

    /// Get the identification's confidence.
    pub fn prob(&self) -> f32 {
        self.prob
    }

    /// true if the primary language subtags are equal (`de-AT` is `de`).
    pub fn is_language(&self, target: &LanguageTag<String>) -> bool {
        self.label
            .primary_language()
            .eq_ignore_ascii_case(target.primary_language())
    }

    /// true if the label is the target and the confidence is at least `threshold`.
    pub fn is_confident(&self, target: &LanguageTag<String>, threshold: f32) -> bool {
        self.is_language(target) && self.prob >= threshold
    }
}
