// File: ottonrent-common/src/models/ui_config.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::traits::Validate;

/// Presentation payload for one screen element.
///
/// The document tree stores these as loosely shaped JSON; on read each
/// value is classified into exactly one variant:
/// - a string is `Text`, a number, bool or null is `Scalar`
/// - an array of strings is `Messages`, any other array is a `List`
/// - an object with a `url` (or `media_url`) string is `Media`
/// - an object whose values are all strings is `Labels`
/// - any other object is a `Section` of nested payloads
///
/// Writing a payload back produces the JSON it was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum UiPayload {
    Text(String),
    Scalar(Value),
    Messages(Vec<String>),
    List(Vec<UiPayload>),
    Media(Media),
    Labels(BTreeMap<String, String>),
    Section(BTreeMap<String, UiPayload>),
}

/// An image or video reference. Fields other than the url and a text
/// caption ride along in `extra` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub url: String,
    pub caption: Option<String>,
    pub extra: Map<String, Value>,
    url_key: &'static str,
}

impl Media {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: None,
            extra: Map::new(),
            url_key: "url",
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Name of the field the url is stored under.
    pub fn url_key(&self) -> &'static str {
        self.url_key
    }

    fn from_object(mut obj: Map<String, Value>) -> Result<Self, Map<String, Value>> {
        let url_key = ["url", "media_url"]
            .into_iter()
            .find(|key| obj.get(*key).is_some_and(Value::is_string));
        let Some(url_key) = url_key else {
            return Err(obj);
        };
        let url = match obj.remove(url_key) {
            Some(Value::String(url)) => url,
            _ => return Err(obj),
        };
        let caption = match obj.remove("caption") {
            Some(Value::String(caption)) => Some(caption),
            Some(other) => {
                obj.insert("caption".to_string(), other);
                None
            }
            None => None,
        };
        Ok(Self {
            url,
            caption,
            extra: obj,
            url_key,
        })
    }

    fn to_value(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert(self.url_key.to_string(), Value::String(self.url.clone()));
        if let Some(caption) = &self.caption {
            obj.insert("caption".to_string(), Value::String(caption.clone()));
        }
        Value::Object(obj)
    }
}

impl UiPayload {
    pub fn media(url: impl Into<String>, caption: Option<&str>) -> Self {
        let media = Media::new(url);
        UiPayload::Media(match caption {
            Some(caption) => media.with_caption(caption),
            None => media,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UiPayload::Text(_) => "text",
            UiPayload::Scalar(_) => "scalar",
            UiPayload::Messages(_) => "messages",
            UiPayload::List(_) => "list",
            UiPayload::Media(_) => "media",
            UiPayload::Labels(_) => "labels",
            UiPayload::Section(_) => "section",
        }
    }

    pub fn classify(value: Value) -> Self {
        match value {
            Value::String(s) => UiPayload::Text(s),
            Value::Array(items) if items.iter().all(Value::is_string) => UiPayload::Messages(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Array(items) => UiPayload::List(items.into_iter().map(UiPayload::classify).collect()),
            Value::Object(obj) => {
                let obj = match Media::from_object(obj) {
                    Ok(media) => return UiPayload::Media(media),
                    Err(obj) => obj,
                };
                if obj.values().all(Value::is_string) {
                    let labels = obj
                        .into_iter()
                        .filter_map(|(k, v)| match v {
                            Value::String(s) => Some((k, s)),
                            _ => None,
                        })
                        .collect();
                    return UiPayload::Labels(labels);
                }
                UiPayload::Section(
                    obj.into_iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| (k, UiPayload::classify(v)))
                        .collect(),
                )
            }
            scalar => UiPayload::Scalar(scalar),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            UiPayload::Text(s) => Value::String(s.clone()),
            UiPayload::Scalar(v) => v.clone(),
            UiPayload::Messages(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            UiPayload::List(items) => Value::Array(items.iter().map(UiPayload::to_value).collect()),
            UiPayload::Media(media) => media.to_value(),
            UiPayload::Labels(labels) => Value::Object(
                labels
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            UiPayload::Section(fields) => {
                Value::Object(fields.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
            }
        }
    }
}

impl Serialize for UiPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UiPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(UiPayload::classify)
    }
}

/// Per-screen presentation settings: captions, button labels, media, message
/// lists. Pure configuration, edited through the same panel machinery as the
/// business data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiConfig {
    pub screens: BTreeMap<String, UiPayload>,
}

impl UiConfig {
    pub fn get(&self, screen: &str) -> Option<&UiPayload> {
        self.screens.get(screen)
    }
}

impl Validate for UiConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (key, payload) in &self.screens {
            if let UiPayload::Media(media) = payload {
                if media.url.trim().is_empty() {
                    return Err(ValidationError::Invalid {
                        field: "url",
                        reason: format!("media '{key}' has an empty url"),
                    });
                }
            }
        }
        Ok(())
    }
}
