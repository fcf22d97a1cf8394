/// A prepared report image, already downscaled and format-normalized by the
/// capture side. The core sends it as-is and retains it for retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new<S: Into<String>, T: Into<String>>(data: Vec<u8>, file_name: S, mime_type: T) -> Self {
        ImagePayload {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
