use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error in {path}: {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("required setting '{key}' is missing or empty in {path}")]
    MissingKey { path: String, key: &'static str },

    #[error("unsupported settings file extension '{extension}' for {path} (expected .json, .yml or .yaml)")]
    UnsupportedFormat { path: String, extension: String },
}
