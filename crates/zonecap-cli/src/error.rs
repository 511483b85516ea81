use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to load runner config: {0}")]
    Config(#[from] serdeconv::Error),

    #[error("failed to build logger: {0}")]
    Logging(#[from] sloggers::Error),

    #[error("static data store failed to load: {0}")]
    DataStoreLoad(#[from] zonecap_core::error::CoreError),

    #[error("failed to read capture directory {path}: {source}")]
    CaptureDir { path: String, source: std::io::Error },

    #[error("failed to write zone output: {0}")]
    Xml(#[from] zonecap_xml::XmlError),

    #[error("failed to write output file {path}: {source}")]
    OutputFile { path: String, source: std::io::Error },
}
