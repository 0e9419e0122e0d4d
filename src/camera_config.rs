use serde::{Deserialize, Serialize};

/// One snapshot endpoint and the directory slot its images land in.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CameraHost {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "NAME")]
    pub name: String, // used verbatim as a path segment under the capture directory
}
