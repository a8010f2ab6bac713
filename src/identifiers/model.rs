/*! fastText backed detection (cargo feature `fasttext`).

Works with the language identification models distributed by fastText
(`lid.176.bin`). Labels are converted to BCP-47 (`__label__de` -> `de`).
!*/
use std::path::Path;

use fasttext::{FastText as FastTextLib, Prediction};
use oxilangtag::{LanguageTag, LanguageTagParseError};

use super::{Detect, Identification};
use crate::error::Error;

impl TryFrom<Prediction> for Identification {
    type Error = LanguageTagParseError;
    fn try_from(prediction: Prediction) -> Result<Self, LanguageTagParseError> {
        // skip __label__
        let label = prediction.label.chars().skip(9).collect::<String>();

        //convert to valid bcp47
        let label = label.replace('_', "-");

        Ok(Identification::new(
            LanguageTag::parse_and_normalize(&label)?,
            prediction.prob,
        ))
    }
}

pub struct FastTextDetector {
    inner: FastTextLib,
    threshold: f32,
}

impl FastTextDetector {
    /// Load a model. Predictions below `threshold` are discarded.
    pub fn new(model: &Path, threshold: f32) -> Result<Self, Error> {
        let mut inner = FastTextLib::new();
        let path = model
            .to_str()
            .ok_or_else(|| Error::Custom(format!("{:?} is not valid unicode", model)))?;
        inner.load_model(path).map_err(Error::FastText)?;
        Ok(Self { inner, threshold })
    }
}

impl Detect for FastTextDetector {
    fn name(&self) -> &'static str {
        "fasttext"
    }

    fn detect(&self, text: &str) -> Option<Identification> {
        // fastText predicts on a single line
        let line = text.replace('\n', " ");
        let predictions = match self.inner.predict(&line, 1, self.threshold) {
            Ok(predictions) => predictions,
            Err(e) => {
                error!("fasttext prediction failed: {e}");
                return None;
            }
        };

        let prediction = predictions.into_iter().next()?;
        match Identification::try_from(prediction) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("invalid fasttext label: {e}");
                None
            }
        }
    }
}
