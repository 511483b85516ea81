use std::io;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml write failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
