//! Converts a JSON resource value into the bytes for the negotiated
//! wire format (spec §4.8 step 5): JSON passthrough, XML via
//! `fhirsmith-format`, HTML via [`crate::html`].

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::content_negotiation::{ContentFormat, ContentNegotiation};
use crate::html;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format conversion failed: {0}")]
    ConversionFailed(#[from] fhirsmith_format::FormatError),

    #[error("json serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub struct ResourceFormatter {
    negotiation: ContentNegotiation,
}

impl ResourceFormatter {
    pub fn new(negotiation: ContentNegotiation) -> Self {
        Self { negotiation }
    }

    pub fn content_type(&self) -> String {
        format!("{}; charset=utf-8", self.negotiation.response_mime_type())
    }

    pub fn format(&self, resource: JsonValue) -> Result<Vec<u8>, FormatError> {
        match self.negotiation.format {
            ContentFormat::Json => {
                if self.negotiation.pretty {
                    Ok(serde_json::to_vec_pretty(&resource)?)
                } else {
                    Ok(serde_json::to_vec(&resource)?)
                }
            }
            ContentFormat::Xml => {
                let json_str = serde_json::to_string(&resource)?;
                let xml_str = fhirsmith_format::json_to_xml(&json_str)?;
                Ok(xml_str.into_bytes())
            }
            ContentFormat::Html => Ok(html::render_page(&resource, self.negotiation.elements.as_deref())
                .into_bytes()),
        }
    }
}
