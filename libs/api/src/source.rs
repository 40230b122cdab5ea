use serde::{Deserialize, Serialize};

/// Top-level shape of an Icecast `status-json.xsl` response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IceStatus {
    pub icestats: IceStats,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IceStats {
    /// Missing entirely when no stream is online; a bare object when exactly
    /// one is.
    #[serde(default)]
    pub source: Option<OneOrMany<Source>>,
}

impl IceStatus {
    pub fn sources(self) -> Vec<Source> {
        match self.icestats.source {
            Some(s) => s.into_vec(),
            None => Vec::new(),
        }
    }
}

/// Icecast emits a single JSON object instead of a one-element array.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Source {
    pub listenurl: String,
    #[serde(default)]
    pub server_description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

impl Source {
    /// Mount identifier: the last path segment of the listen URL.
    pub fn host(&self) -> &str {
        self.listenurl.rsplit('/').next().unwrap_or(&self.listenurl)
    }

    pub fn description(&self) -> &str {
        self.server_description.as_deref().unwrap_or("No description")
    }

    pub fn genre(&self) -> &str {
        self.genre.as_deref().unwrap_or("various")
    }
}

/// Icecast renders an untitled source as the literal token `-`, which is not
/// valid JSON. Repair the body before parsing.
pub fn repair_status_body(raw: &str) -> String {
    raw.replace("\"title\": - ,", "\"title\": null,")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_list() {
        let body = r#"{"icestats":{"source":[
            {"listenurl":"http://example.org:8000/pineland","server_description":"Sunday Service","genre":"various"},
            {"listenurl":"http://example.org:8000/newdale"}
        ]}}"#;
        let status: IceStatus = serde_json::from_str(body).unwrap();
        let sources = status.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].host(), "pineland");
        assert_eq!(sources[0].description(), "Sunday Service");
        assert_eq!(sources[1].description(), "No description");
        assert_eq!(sources[1].genre(), "various");
    }

    #[test]
    fn parses_single_source_object() {
        let body = r#"{"icestats":{"source":
            {"listenurl":"http://example.org:8000/pineland","server_description":"Sunday Service"}
        }}"#;
        let status: IceStatus = serde_json::from_str(body).unwrap();
        let sources = status.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].host(), "pineland");
    }

    #[test]
    fn parses_empty_status() {
        let body = r#"{"icestats":{}}"#;
        let status: IceStatus = serde_json::from_str(body).unwrap();
        assert!(status.sources().is_empty());
    }

    #[test]
    fn repairs_untitled_source() {
        let raw = r#"{"icestats":{"source":{"listenurl":"http://example.org:8000/x","title": - ,"genre":"various"}}}"#;
        let status: IceStatus = serde_json::from_str(&repair_status_body(raw)).unwrap();
        let sources = status.sources();
        assert_eq!(sources[0].title, None);
    }
}
