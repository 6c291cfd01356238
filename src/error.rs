use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    /// Rejected before any workbook I/O: bad extension, empty source file,
    /// empty record list, missing target directory, bad cell range.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// Source bytes could not be parsed as the declared spreadsheet variant.
    #[error("Spreadsheet format error: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A style descriptor failed to parse. Non-fatal inside column resolution.
    #[error("Style decode error: {0}")]
    Decode(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl SheetError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SheetError::InputValidation(message.into())
    }

    /// True for errors raised before any workbook was opened or mutated.
    pub fn is_input_validation(&self) -> bool {
        matches!(self, SheetError::InputValidation(_))
    }
}

impl From<rust_xlsxwriter::XlsxError> for SheetError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SheetError::Export(e.to_string())
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(e: serde_json::Error) -> Self {
        SheetError::Decode(e.to_string())
    }
}

impl From<serde_yaml::Error> for SheetError {
    fn from(e: serde_yaml::Error) -> Self {
        SheetError::InputValidation(format!("mapping config: {}", e))
    }
}
